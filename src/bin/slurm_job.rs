use anyhow::Context;
use bookrec_etl::config::slurm::JobScript;
use bookrec_etl::utils::{logger, validation::Validate};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "slurm-job")]
#[command(about = "Render or check the SLURM batch scripts that run the acquisition job")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    /// 24h limit, anaconda on PATH
    Daily,
    /// 4h limit, anaconda via `module load`
    Short,
}

#[derive(Subcommand)]
enum Command {
    /// Print (or write) a job script for a preset
    Render {
        #[arg(long, value_enum, default_value = "daily")]
        preset: Preset,

        /// Address for END/FAIL notifications
        #[arg(long)]
        mail_user: String,

        #[arg(long)]
        account: Option<String>,

        #[arg(long)]
        workdir: Option<String>,

        #[arg(long)]
        conda_env: Option<String>,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Parse and validate existing job scripts
    Check {
        #[arg(required = true)]
        files: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    match args.command {
        Command::Render {
            preset,
            mail_user,
            account,
            workdir,
            conda_env,
            output,
        } => {
            let mut script = match preset {
                Preset::Daily => JobScript::daily_fetch(),
                Preset::Short => JobScript::short_fetch(),
            }
            .with_mail_user(&mail_user);

            if let Some(account) = account {
                script.directives.account = account;
            }
            if let Some(workdir) = workdir {
                script.workdir = workdir;
            }
            if let Some(env) = conda_env {
                script.conda_env = Some(env);
            }

            script.validate()?;
            let rendered = script.render();

            match output {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("writing job script to {}", path))?;
                    println!("✅ Job script written to {}", path);
                }
                None => print!("{}", rendered),
            }
        }
        Command::Check { files } => {
            let mut failures = 0;
            for path in &files {
                match JobScript::check_file(path) {
                    Ok(script) => {
                        tracing::debug!("{}: {:?}", path, script.directives);
                        println!(
                            "✅ {} ({}, {} on {})",
                            path,
                            script.directives.job_name,
                            script.directives.time_limit,
                            script.directives.partition
                        );
                    }
                    Err(e) => {
                        failures += 1;
                        eprintln!("❌ {}: {}", path, e);
                        eprintln!("💡 {}", e.recovery_suggestion());
                    }
                }
            }

            if failures > 0 {
                tracing::error!("{} of {} job scripts failed the check", failures, files.len());
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
