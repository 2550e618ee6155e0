fn main() -> std::process::ExitCode {
    shadow_monitor_lib::run()
}
