use crate::demo::{run_demo, run_emi, run_score, DemoArgs, EmiArgs, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use credit_underwriting::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Credit Underwriting Service",
    about = "Run the credit underwriting wizard service or score applicants from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Walk a sample applicant through the wizard and print the decision
    Demo(DemoArgs),
    /// Score a CSV of applicants with the configured credit model
    Score(ScoreArgs),
    /// Quote the monthly installment for a loan
    Emi(EmiArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args).await,
        Command::Score(args) => run_score(args),
        Command::Emi(args) => run_emi(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["credit-underwriting-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn score_takes_an_input_and_optional_output() {
        let cli = Cli::try_parse_from([
            "credit-underwriting-api",
            "score",
            "applicants.csv",
            "--output",
            "scored.csv",
        ])
        .expect("parses");
        match cli.command {
            Some(Command::Score(args)) => {
                assert_eq!(args.input.to_str(), Some("applicants.csv"));
                assert_eq!(
                    args.output.as_deref().and_then(|path| path.to_str()),
                    Some("scored.csv")
                );
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn demo_defaults_to_the_reference_applicant() {
        let cli = Cli::try_parse_from(["credit-underwriting-api", "demo", "--cibil-score", "640"])
            .expect("parses");
        match cli.command {
            Some(Command::Demo(args)) => {
                assert_eq!(args.cibil_score, 640);
                assert_eq!(args.loan_amount, 600_000.0);
                assert!(!args.skip_documents);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn emi_requires_every_term() {
        assert!(Cli::try_parse_from(["credit-underwriting-api", "emi", "--principal", "1000"]).is_err());
    }
}
