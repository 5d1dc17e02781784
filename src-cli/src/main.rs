fn main() -> std::process::ExitCode {
    formqa_lib::run()
}
