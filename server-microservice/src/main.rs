use std::process::ExitCode;

use bootstrap::Bootstrap;

fn main() -> ExitCode {
    server_microservice::start(&Bootstrap, std::env::args_os().skip(1).collect())
}
