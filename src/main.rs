use lockwatch::cli;

fn main() -> anyhow::Result<()> {
    if let Err(e) = cli::run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use lockwatch::cli::{Command, LockwatchCli};

    #[test]
    fn replay_command_accepts_negative_rate() {
        let cli = LockwatchCli::parse_from([
            "lockwatch",
            "replay",
            "scenario.json",
            "--sample-rate",
            "-5",
            "--depth",
            "16",
            "-j",
            "4",
        ]);
        let Command::Replay {
            scenario,
            sample_rate,
            depth,
            no_stack_trace,
            jobs,
        } = cli.command();
        assert_eq!(scenario.to_string_lossy(), "scenario.json");
        assert_eq!(*sample_rate, Some(-5));
        assert_eq!(*depth, Some(16));
        assert!(!no_stack_trace);
        assert_eq!(*jobs, 4);
    }

    #[test]
    fn no_stack_trace_help_says_it_disables_the_monitor() {
        let command = <LockwatchCli as CommandFactory>::command();
        let replay = command.find_subcommand("replay").unwrap();
        let flag = replay
            .get_arguments()
            .find(|arg| arg.get_id() == "no_stack_trace")
            .unwrap();
        let help = flag.get_help().unwrap().to_string();
        assert!(help.contains("no events are sampled"));
        assert!(help.contains("not only stack traces"));
    }

    #[test]
    fn no_stack_trace_flag_parses() {
        let cli = LockwatchCli::parse_from(["lockwatch", "replay", "s.json", "--no-stack-trace"]);
        let Command::Replay { no_stack_trace, .. } = cli.command();
        assert!(*no_stack_trace);
    }
}
