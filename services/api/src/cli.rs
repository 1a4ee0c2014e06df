use crate::demo::{run_demo, run_score, DemoArgs, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use mindwell::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "MindWell",
    about = "Run the MindWell self-assessment service or score questionnaires from the command line",
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
    /// Score a single PHQ-9 or GAD-7 questionnaire without storing it
    Score(ScoreArgs),
    /// Replay a simulated stretch of daily check-ins through the engine
    Demo(DemoArgs),
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
        Command::Score(args) => run_score(args),
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindwell::assessments::AssessmentType;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["mindwell"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn score_arguments_are_parsed() {
        let cli = Cli::try_parse_from([
            "mindwell",
            "score",
            "--type",
            "gad-7",
            "--responses",
            "1,2,3,0,1,2,3",
        ])
        .expect("parses");
        match cli.command {
            Some(Command::Score(args)) => {
                assert_eq!(args.assessment_type, AssessmentType::Gad7);
                assert_eq!(args.responses, vec![1, 2, 3, 0, 1, 2, 3]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn unknown_questionnaires_are_rejected_by_the_parser() {
        assert!(Cli::try_parse_from(["mindwell", "score", "--type", "BDI", "--responses", "1"])
            .is_err());
    }

    #[test]
    fn demo_days_are_bounded() {
        let cli = Cli::try_parse_from(["mindwell", "demo", "--days", "30"]).expect("parses");
        match cli.command {
            Some(Command::Demo(args)) => assert_eq!(args.days, 30),
            other => panic!("unexpected command {other:?}"),
        }

        for days in ["0", "3651", "100000", "4294967295"] {
            assert!(
                Cli::try_parse_from(["mindwell", "demo", "--days", days]).is_err(),
                "--days {days} accepted"
            );
        }
    }
}
