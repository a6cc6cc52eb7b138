mod platform;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use examscan_core::{Msg, ScanOptions, SheetOptions};

use platform::config::AppConfig;

#[derive(Parser)]
#[command(name = "examscan", about = "Generate exam QR sheets and ingest scanned exams")]
struct Cli {
    /// RON configuration file (default: ./examscan.ron if present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Worker program, overriding the configured one
    #[arg(long)]
    worker: Option<String>,
    /// Directory receiving the generated files
    #[arg(long)]
    download_dir: Option<PathBuf>,
    #[arg(long, short)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate QR code sheets for a roster
    Sheets {
        #[arg(long)]
        roster: PathBuf,
        /// 1-based roster rows to include (default: all)
        #[arg(long, value_delimiter = ',')]
        select: Vec<usize>,
        #[arg(long, default_value_t = 1)]
        copies: u32,
        #[arg(long, default_value_t = 1)]
        offset_row: u32,
        #[arg(long, default_value_t = 1)]
        offset_col: u32,
    },
    /// Read QR codes from scanned exam documents
    Scan {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        two_page_scan: bool,
        #[arg(long)]
        split_a3: bool,
        #[arg(long)]
        quick: bool,
    },
    /// Start the background unit and wait until it is ready
    WarmUp,
}

fn script(command: &Command) -> Result<Vec<Msg>> {
    let mut msgs = Vec::new();
    match command {
        Command::Sheets {
            roster,
            select,
            copies,
            offset_row,
            offset_col,
        } => {
            msgs.push(platform::uploads::roster(roster));
            if !select.is_empty() {
                msgs.push(Msg::SubjectSelectionToggled(true));
                msgs.push(Msg::SelectAllToggled(false));
                for row in select {
                    let Some(index) = row.checked_sub(1) else {
                        bail!("roster rows are numbered from 1");
                    };
                    msgs.push(Msg::SubjectToggled {
                        index,
                        selected: true,
                    });
                }
            }
            msgs.push(Msg::SheetOptionsChanged(SheetOptions::new(
                *copies,
                *offset_row,
                *offset_col,
            )));
            msgs.push(Msg::GenerateSheetsClicked);
        }
        Command::Scan {
            files,
            two_page_scan,
            split_a3,
            quick,
        } => {
            msgs.extend(files.iter().map(|path| platform::uploads::document(path)));
            msgs.push(Msg::ScanOptionsChanged(ScanOptions {
                two_page_scan: *two_page_scan,
                split_a3: *split_a3,
                quick_mode: *quick,
            }));
            msgs.push(Msg::ScanClicked);
        }
        Command::WarmUp => msgs.push(Msg::WarmUpRequested),
    }
    Ok(msgs)
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(worker) = cli.worker {
        config.worker.program = worker;
        config.worker.args.clear();
    }
    if let Some(dir) = cli.download_dir {
        config.download_dir = dir;
    }
    platform::logging::initialize(config.log, cli.verbose);

    let msgs = script(&cli.command)?;
    let outcome = platform::run_session(&config, msgs);
    if outcome.output.is_empty() {
        eprintln!("nothing to do");
    }
    Ok(if outcome.errors == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("examscan").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn selection_becomes_zero_based_toggles() {
        let temp = tempfile::TempDir::new().unwrap();
        let roster = temp.path().join("r.csv");
        std::fs::write(&roster, "id,name\n1,A\n2,B\n3,C\n").unwrap();
        let roster_arg = roster.to_string_lossy().into_owned();

        let cli = parse(&["sheets", "--roster", &roster_arg, "--select", "1,3", "--copies", "2"]);
        let msgs = script(&cli.command).unwrap();
        assert_eq!(
            &msgs[1..],
            &[
                Msg::SubjectSelectionToggled(true),
                Msg::SelectAllToggled(false),
                Msg::SubjectToggled {
                    index: 0,
                    selected: true
                },
                Msg::SubjectToggled {
                    index: 2,
                    selected: true
                },
                Msg::SheetOptionsChanged(SheetOptions::new(2, 1, 1)),
                Msg::GenerateSheetsClicked,
            ]
        );
    }

    #[test]
    fn row_zero_is_rejected() {
        let cli = parse(&["sheets", "--roster", "r.csv", "--select", "0"]);
        assert!(script(&cli.command).is_err());
    }

    #[test]
    fn scan_flags_map_to_options() {
        let cli = parse(&["--download-dir", "out", "scan", "a.pdf", "--split-a3", "--quick"]);
        assert_eq!(cli.download_dir, Some(PathBuf::from("out")));
        let msgs = script(&cli.command).unwrap();
        assert_eq!(
            &msgs[1..],
            &[
                Msg::ScanOptionsChanged(ScanOptions {
                    two_page_scan: false,
                    split_a3: true,
                    quick_mode: true,
                }),
                Msg::ScanClicked,
            ]
        );
    }

    #[test]
    fn scan_requires_files() {
        assert!(Cli::try_parse_from(["examscan", "scan"]).is_err());
    }
}
