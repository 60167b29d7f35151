use clap::Parser;
use layer_puller::cli::{Args, Runner};
use layer_puller::logging::{Logger, init_tracing};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose, args.quiet);

    let runner = match Runner::new(args) {
        Ok(runner) => runner,
        Err(e) => {
            Logger::new(false).error(&e.to_string());
            return ExitCode::from(2);
        }
    };

    match runner.run().await {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            runner.output().error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
