//! SLURM batch script model for the acquisition job.
//!
//! A script is a `#SBATCH` directive block followed by a short body:
//! environment setup (PATH prefix or `module load`), `source activate`,
//! `cd` into the project and a single command. `JobScript::parse` reads
//! what `JobScript::render` writes.

use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_ACCOUNT: &str = "p30791";
pub const DEFAULT_WORKDIR: &str = "/projects/p30791/book-rec";
pub const DEFAULT_CONDA_ENV: &str = "book-rec";
pub const DEFAULT_COMMAND: &str = "python tools/obtain_historical_data.py";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MailType {
    None,
    Begin,
    End,
    Fail,
    Requeue,
    All,
    TimeLimit,
}

impl MailType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MailType::None => "NONE",
            MailType::Begin => "BEGIN",
            MailType::End => "END",
            MailType::Fail => "FAIL",
            MailType::Requeue => "REQUEUE",
            MailType::All => "ALL",
            MailType::TimeLimit => "TIME_LIMIT",
        }
    }
}

impl fmt::Display for MailType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MailType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" => Ok(MailType::None),
            "BEGIN" => Ok(MailType::Begin),
            "END" => Ok(MailType::End),
            "FAIL" => Ok(MailType::Fail),
            "REQUEUE" => Ok(MailType::Requeue),
            "ALL" => Ok(MailType::All),
            "TIME_LIMIT" => Ok(MailType::TimeLimit),
            other => Err(format!("unknown mail type '{}'", other)),
        }
    }
}

/// Wall-clock limit, stored in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeLimit {
    seconds: u64,
}

impl TimeLimit {
    pub fn from_hours(hours: u64) -> Self {
        Self {
            seconds: hours.saturating_mul(3600),
        }
    }

    pub fn as_secs(&self) -> u64 {
        self.seconds
    }
}

impl fmt::Display for TimeLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.seconds / 3600;
        let minutes = (self.seconds % 3600) / 60;
        let seconds = self.seconds % 60;
        write!(f, "{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

fn parse_number(part: &str, input: &str) -> std::result::Result<u64, String> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("invalid time limit '{}'", input));
    }
    part.parse::<u64>()
        .map_err(|_| format!("invalid time limit '{}'", input))
}

impl FromStr for TimeLimit {
    type Err = String;

    /// `M`, `M:S`, `H:M:S`, `D-H`, `D-H:M`, `D-H:M:S`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let input = s.trim();
        let (days, rest) = match input.split_once('-') {
            Some((d, rest)) => (Some(parse_number(d, input)?), rest),
            None => (None, input),
        };

        let parts = rest
            .split(':')
            .map(|p| parse_number(p, input))
            .collect::<std::result::Result<Vec<u64>, String>>()?;

        let (d, h, m, s) = match (days, parts.as_slice()) {
            (None, [m]) => (0, 0, *m, 0),
            (None, [m, s]) => (0, 0, *m, *s),
            (None, [h, m, s]) => (0, *h, *m, *s),
            (Some(d), [h]) => (d, *h, 0, 0),
            (Some(d), [h, m]) => (d, *h, *m, 0),
            (Some(d), [h, m, s]) => (d, *h, *m, *s),
            _ => return Err(format!("invalid time limit '{}'", input)),
        };

        let seconds = d
            .checked_mul(86400)
            .and_then(|total| total.checked_add(h.checked_mul(3600)?))
            .and_then(|total| total.checked_add(m.checked_mul(60)?))
            .and_then(|total| total.checked_add(s))
            .ok_or_else(|| format!("invalid time limit '{}': out of range", input))?;

        Ok(Self { seconds })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryUnit {
    K,
    M,
    G,
    T,
}

impl MemoryUnit {
    fn suffix(&self) -> char {
        match self {
            MemoryUnit::K => 'K',
            MemoryUnit::M => 'M',
            MemoryUnit::G => 'G',
            MemoryUnit::T => 'T',
        }
    }
}

/// `--mem` value; SLURM treats a bare number as megabytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySize {
    pub amount: u64,
    pub unit: MemoryUnit,
}

impl MemorySize {
    pub fn gigabytes(amount: u64) -> Self {
        Self {
            amount,
            unit: MemoryUnit::G,
        }
    }
}

impl fmt::Display for MemorySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.suffix())
    }
}

impl FromStr for MemorySize {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let input = s.trim();
        let digits_end = input
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(input.len());
        let (digits, suffix) = input.split_at(digits_end);

        let amount = digits
            .parse::<u64>()
            .map_err(|_| format!("invalid memory size '{}'", input))?;
        let unit = match suffix.to_ascii_uppercase().as_str() {
            "" | "M" | "MB" => MemoryUnit::M,
            "K" | "KB" => MemoryUnit::K,
            "G" | "GB" => MemoryUnit::G,
            "T" | "TB" => MemoryUnit::T,
            _ => return Err(format!("invalid memory unit in '{}'", input)),
        };

        Ok(Self { amount, unit })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDirectives {
    pub account: String,
    pub partition: String,
    pub time_limit: TimeLimit,
    pub nodes: u32,
    pub tasks: u32,
    pub memory: MemorySize,
    pub job_name: String,
    pub mail_user: Option<String>,
    pub mail_types: Vec<MailType>,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvSetup {
    /// `export PATH=<dir>:$PATH`
    PathPrepend(String),
    /// `module load <name>`
    ModuleLoad(String),
}

impl fmt::Display for EnvSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvSetup::PathPrepend(dir) => write!(f, "export PATH={}:$PATH", dir),
            EnvSetup::ModuleLoad(name) => write!(f, "module load {}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobScript {
    pub directives: JobDirectives,
    pub env_setup: Option<EnvSetup>,
    pub conda_env: Option<String>,
    pub workdir: String,
    pub command: String,
}

impl JobScript {
    /// 24 小時版本，直接把 anaconda 放進 PATH
    pub fn daily_fetch() -> Self {
        Self {
            directives: JobDirectives {
                account: DEFAULT_ACCOUNT.to_string(),
                partition: "normal".to_string(),
                time_limit: TimeLimit::from_hours(24),
                nodes: 1,
                tasks: 1,
                memory: MemorySize::gigabytes(1),
                job_name: "obtain_historical_data".to_string(),
                mail_user: None,
                mail_types: vec![MailType::End, MailType::Fail],
                output: format!("{}/logs/obtain_historical_data.log", DEFAULT_WORKDIR),
            },
            env_setup: Some(EnvSetup::PathPrepend("/software/anaconda3/bin".to_string())),
            conda_env: Some(DEFAULT_CONDA_ENV.to_string()),
            workdir: DEFAULT_WORKDIR.to_string(),
            command: DEFAULT_COMMAND.to_string(),
        }
    }

    /// 4 小時版本，用 module 系統載入 anaconda
    pub fn short_fetch() -> Self {
        let mut script = Self::daily_fetch();
        script.directives.partition = "short".to_string();
        script.directives.time_limit = TimeLimit::from_hours(4);
        script.directives.job_name = "obtain_historical_data_short".to_string();
        script.directives.output = format!("{}/logs/obtain_historical_data_short.log", DEFAULT_WORKDIR);
        script.env_setup = Some(EnvSetup::ModuleLoad("python-anaconda3".to_string()));
        script
    }

    pub fn with_mail_user(mut self, mail_user: &str) -> Self {
        self.directives.mail_user = Some(mail_user.to_string());
        self
    }

    pub fn render(&self) -> String {
        let d = &self.directives;
        let mut lines = vec![
            "#!/bin/bash".to_string(),
            format!("#SBATCH -A {}", d.account),
            format!("#SBATCH -p {}", d.partition),
            format!("#SBATCH -t {}", d.time_limit),
            format!("#SBATCH -N {}", d.nodes),
            format!("#SBATCH -n {}", d.tasks),
            format!("#SBATCH --mem={}", d.memory),
            format!("#SBATCH --job-name={}", d.job_name),
        ];
        if let Some(user) = &d.mail_user {
            lines.push(format!("#SBATCH --mail-user={}", user));
        }
        if !d.mail_types.is_empty() {
            let types: Vec<&str> = d.mail_types.iter().map(MailType::as_str).collect();
            lines.push(format!("#SBATCH --mail-type={}", types.join(",")));
        }
        lines.push(format!("#SBATCH --output={}", d.output));
        lines.push(String::new());

        if let Some(setup) = &self.env_setup {
            lines.push(setup.to_string());
        }
        if let Some(env) = &self.conda_env {
            lines.push(format!("source activate {}", env));
        }
        lines.push(format!("cd {}", self.workdir));
        lines.push(self.command.clone());

        let mut script = lines.join("\n");
        script.push('\n');
        script
    }

    pub fn parse(content: &str) -> Result<Self> {
        ScriptParser::new()?.parse(content)
    }

    /// 讀檔、解析並驗證；讀不到的檔案也回報為腳本錯誤
    pub fn check_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            script_error(0, format!("cannot read {}: {}", path.display(), e))
        })?;
        let script = Self::parse(&content)?;
        script.validate()?;
        Ok(script)
    }
}

#[derive(Default)]
struct PartialDirectives {
    account: Option<String>,
    partition: Option<String>,
    time_limit: Option<TimeLimit>,
    nodes: Option<u32>,
    tasks: Option<u32>,
    memory: Option<MemorySize>,
    job_name: Option<String>,
    mail_user: Option<String>,
    mail_types: Option<Vec<MailType>>,
    output: Option<String>,
}

struct ScriptParser {
    path_prepend: Regex,
}

fn script_error(line: usize, message: impl Into<String>) -> EtlError {
    EtlError::JobScriptError {
        line,
        message: message.into(),
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T, name: &str, line: usize) -> Result<()> {
    if slot.is_some() {
        return Err(script_error(line, format!("duplicate directive '{}'", name)));
    }
    *slot = Some(value);
    Ok(())
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value)
}

impl ScriptParser {
    fn new() -> Result<Self> {
        let path_prepend = Regex::new(r#"^export\s+PATH=["']?(.+?):\$\{?PATH\}?["']?$"#)
            .map_err(|e| EtlError::ProcessingError {
                message: format!("Invalid PATH pattern: {}", e),
            })?;
        Ok(Self { path_prepend })
    }

    fn parse(&self, content: &str) -> Result<JobScript> {
        let mut directives = PartialDirectives::default();
        let mut env_setup = None;
        let mut conda_env = None;
        let mut workdir = None;
        let mut command: Option<String> = None;

        for (index, raw) in content.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();

            if line.is_empty() || (line_no == 1 && line.starts_with("#!")) {
                continue;
            }
            if let Some(rest) = line.strip_prefix("#SBATCH") {
                if command.is_some() {
                    return Err(script_error(line_no, "#SBATCH directive after the job command"));
                }
                self.parse_directive(rest.trim(), line_no, &mut directives)?;
                continue;
            }
            if line.starts_with('#') {
                continue;
            }
            if command.is_some() {
                return Err(script_error(line_no, format!("unexpected line after the job command: '{}'", line)));
            }

            if let Some(caps) = self.path_prepend.captures(line) {
                set_once(&mut env_setup, EnvSetup::PathPrepend(caps[1].to_string()), "export PATH", line_no)?;
            } else if let Some(module) = line.strip_prefix("module load ") {
                set_once(&mut env_setup, EnvSetup::ModuleLoad(module.trim().to_string()), "module load", line_no)?;
            } else if line == "module purge" {
                continue;
            } else if let Some(env) = line
                .strip_prefix("source activate ")
                .or_else(|| line.strip_prefix("conda activate "))
            {
                set_once(&mut conda_env, env.trim().to_string(), "activate", line_no)?;
            } else if let Some(dir) = line.strip_prefix("cd ") {
                set_once(&mut workdir, unquote(dir.trim()).to_string(), "cd", line_no)?;
            } else {
                command = Some(line.to_string());
            }
        }

        let required = |value: Option<String>, name: &str| {
            value.ok_or_else(|| script_error(0, format!("missing {}", name)))
        };

        Ok(JobScript {
            directives: JobDirectives {
                account: required(directives.account, "account (-A)")?,
                partition: required(directives.partition, "partition (-p)")?,
                time_limit: directives
                    .time_limit
                    .ok_or_else(|| script_error(0, "missing time limit (-t)"))?,
                nodes: directives.nodes.unwrap_or(1),
                tasks: directives.tasks.unwrap_or(1),
                memory: directives
                    .memory
                    .ok_or_else(|| script_error(0, "missing memory (--mem)"))?,
                job_name: required(directives.job_name, "job name (--job-name)")?,
                mail_user: directives.mail_user,
                mail_types: directives.mail_types.unwrap_or_default(),
                output: required(directives.output, "output (--output)")?,
            },
            env_setup,
            conda_env,
            workdir: required(workdir, "cd into the working directory")?,
            command: required(command, "job command")?,
        })
    }

    /// `-A value`、`--mem=1G`、`--mem 1G` 三種寫法都接受
    fn parse_directive(&self, text: &str, line: usize, d: &mut PartialDirectives) -> Result<()> {
        let (flag, value) = if let Some(long) = text.strip_prefix("--") {
            match long.split_once('=') {
                Some((name, value)) => (format!("--{}", name), value.trim()),
                None => match long.split_once(char::is_whitespace) {
                    Some((name, value)) => (format!("--{}", name), value.trim()),
                    None => (format!("--{}", long), ""),
                },
            }
        } else if text.starts_with('-') {
            match text.split_once(char::is_whitespace) {
                Some((name, value)) => (name.to_string(), value.trim()),
                None => (text.to_string(), ""),
            }
        } else {
            return Err(script_error(line, format!("malformed directive '{}'", text)));
        };

        let value = unquote(value);
        if value.is_empty() {
            return Err(script_error(line, format!("directive '{}' has no value", flag)));
        }

        let parse_count = |v: &str| {
            v.parse::<u32>()
                .map_err(|_| script_error(line, format!("'{}' expects a number, got '{}'", flag, v)))
        };

        match flag.as_str() {
            "-A" | "--account" => set_once(&mut d.account, value.to_string(), &flag, line),
            "-p" | "--partition" => set_once(&mut d.partition, value.to_string(), &flag, line),
            "-t" | "--time" => {
                let limit = value.parse::<TimeLimit>().map_err(|e| script_error(line, e))?;
                set_once(&mut d.time_limit, limit, &flag, line)
            }
            "-N" | "--nodes" => set_once(&mut d.nodes, parse_count(value)?, &flag, line),
            "-n" | "--ntasks" => set_once(&mut d.tasks, parse_count(value)?, &flag, line),
            "--mem" => {
                let memory = value.parse::<MemorySize>().map_err(|e| script_error(line, e))?;
                set_once(&mut d.memory, memory, &flag, line)
            }
            "-J" | "--job-name" => set_once(&mut d.job_name, value.to_string(), &flag, line),
            "--mail-user" => set_once(&mut d.mail_user, value.to_string(), &flag, line),
            "--mail-type" => {
                let types = value
                    .split(',')
                    .map(|t| t.parse::<MailType>())
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| script_error(line, e))?;
                set_once(&mut d.mail_types, types, &flag, line)
            }
            "-o" | "--output" => set_once(&mut d.output, value.to_string(), &flag, line),
            other => Err(script_error(line, format!("unsupported directive '{}'", other))),
        }
    }
}

impl Validate for JobScript {
    fn validate(&self) -> Result<()> {
        let d = &self.directives;
        validation::validate_non_empty_string("account", &d.account)?;
        validation::validate_non_empty_string("partition", &d.partition)?;
        validation::validate_non_empty_string("job_name", &d.job_name)?;
        validation::validate_path("output", &d.output)?;
        validation::validate_positive_number("nodes", d.nodes as usize, 1)?;
        validation::validate_positive_number("tasks", d.tasks as usize, 1)?;
        validation::validate_absolute_path("workdir", &self.workdir)?;
        validation::validate_non_empty_string("command", &self.command)?;

        if d.time_limit.as_secs() == 0 {
            return Err(EtlError::InvalidConfigValueError {
                field: "time".to_string(),
                value: d.time_limit.to_string(),
                reason: "Time limit must be greater than zero".to_string(),
            });
        }
        if d.memory.amount == 0 {
            return Err(EtlError::InvalidConfigValueError {
                field: "mem".to_string(),
                value: d.memory.to_string(),
                reason: "Memory request must be greater than zero".to_string(),
            });
        }
        if d.job_name.chars().any(char::is_whitespace) {
            return Err(EtlError::InvalidConfigValueError {
                field: "job_name".to_string(),
                value: d.job_name.clone(),
                reason: "Job name cannot contain whitespace".to_string(),
            });
        }

        let wants_mail = d.mail_types.iter().any(|t| *t != MailType::None);
        if wants_mail && d.mail_user.is_none() {
            return Err(EtlError::MissingConfigError {
                field: "mail-user".to_string(),
            });
        }
        if d.mail_types.len() > 1 && d.mail_types.contains(&MailType::None) {
            return Err(EtlError::InvalidConfigValueError {
                field: "mail_type".to_string(),
                value: d.mail_types.iter().map(MailType::as_str).collect::<Vec<_>>().join(","),
                reason: "NONE cannot be combined with other mail types".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAILY_SCRIPT: &str = "#!/bin/bash
#SBATCH -A p30791
#SBATCH -p normal
#SBATCH -t 24:00:00
#SBATCH -N 1
#SBATCH -n 1
#SBATCH --mem=1G
#SBATCH --job-name=obtain_historical_data
#SBATCH --mail-user=reader@example.edu
#SBATCH --mail-type=END,FAIL
#SBATCH --output=/projects/p30791/book-rec/logs/obtain_historical_data.log

export PATH=/software/anaconda3/bin:$PATH
source activate book-rec
cd /projects/p30791/book-rec
python tools/obtain_historical_data.py
";

    #[test]
    fn test_render_daily_preset() {
        let script = JobScript::daily_fetch().with_mail_user("reader@example.edu");
        assert_eq!(script.render(), DAILY_SCRIPT);
    }

    #[test]
    fn test_presets_differ_in_limits_and_setup() {
        let daily = JobScript::daily_fetch();
        let short = JobScript::short_fetch();

        assert_eq!(daily.directives.time_limit.as_secs(), 24 * 3600);
        assert_eq!(short.directives.time_limit.as_secs(), 4 * 3600);
        assert_ne!(daily.directives.job_name, short.directives.job_name);
        assert_eq!(
            short.env_setup,
            Some(EnvSetup::ModuleLoad("python-anaconda3".to_string()))
        );
        assert_eq!(short.directives.memory, MemorySize::gigabytes(1));
        assert!(short.render().contains("#SBATCH -t 04:00:00\n"));
    }

    #[test]
    fn test_parse_render_is_identity() {
        for script in [
            JobScript::daily_fetch().with_mail_user("reader@example.edu"),
            JobScript::short_fetch().with_mail_user("reader@example.edu"),
            JobScript::short_fetch(),
        ] {
            let parsed = JobScript::parse(&script.render()).unwrap();
            assert_eq!(parsed, script);
        }
    }

    #[test]
    fn test_parse_long_and_alternate_forms() {
        let content = "#!/bin/bash
#SBATCH --account=p30791
#SBATCH --partition short
#SBATCH --time=0-04:00:00
#SBATCH --nodes=1
#SBATCH --ntasks=1
#SBATCH --mem=1024
#SBATCH -J fetch
#SBATCH --mail-user=reader@example.edu
#SBATCH --mail-type=all
#SBATCH -o \"/tmp/fetch.log\"

module purge
module load python-anaconda3
conda activate book-rec
cd \"/projects/p30791/book-rec\"
python tools/obtain_historical_data.py
";

        let script = JobScript::parse(content).unwrap();
        assert_eq!(script.directives.partition, "short");
        assert_eq!(script.directives.time_limit.as_secs(), 4 * 3600);
        assert_eq!(
            script.directives.memory,
            MemorySize { amount: 1024, unit: MemoryUnit::M }
        );
        assert_eq!(script.directives.job_name, "fetch");
        assert_eq!(script.directives.mail_types, vec![MailType::All]);
        assert_eq!(script.directives.output, "/tmp/fetch.log");
        assert_eq!(script.conda_env.as_deref(), Some("book-rec"));
        assert_eq!(script.workdir, "/projects/p30791/book-rec");
        assert!(script.validate().is_ok());
    }

    #[test]
    fn test_parse_quoted_path_prepend() {
        let content = DAILY_SCRIPT.replace(
            "export PATH=/software/anaconda3/bin:$PATH",
            "export PATH=\"/opt/conda/bin:${PATH}\"",
        );
        let script = JobScript::parse(&content).unwrap();
        assert_eq!(
            script.env_setup,
            Some(EnvSetup::PathPrepend("/opt/conda/bin".to_string()))
        );
    }

    #[test]
    fn test_path_prepend_with_several_dirs_round_trips() {
        let mut script = JobScript::daily_fetch().with_mail_user("reader@example.edu");
        script.env_setup = Some(EnvSetup::PathPrepend("/opt/a:/opt/b".to_string()));
        assert!(script.validate().is_ok());

        let parsed = JobScript::parse(&script.render()).unwrap();
        assert_eq!(parsed, script);
    }

    #[test]
    fn test_parse_errors_carry_line_numbers() {
        let unknown = DAILY_SCRIPT.replace("#SBATCH -N 1", "#SBATCH --gres=gpu:1");
        assert!(matches!(
            JobScript::parse(&unknown),
            Err(EtlError::JobScriptError { line: 5, .. })
        ));

        let duplicate = DAILY_SCRIPT.replace("#SBATCH -n 1", "#SBATCH -p short");
        assert!(matches!(
            JobScript::parse(&duplicate),
            Err(EtlError::JobScriptError { line: 6, .. })
        ));

        let bad_time = DAILY_SCRIPT.replace("24:00:00", "1:2:3:4");
        assert!(matches!(
            JobScript::parse(&bad_time),
            Err(EtlError::JobScriptError { line: 4, .. })
        ));

        let trailing = format!("{}echo done\n", DAILY_SCRIPT);
        assert!(JobScript::parse(&trailing).is_err());
    }

    #[test]
    fn test_check_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let good = temp_dir.path().join("daily.sh");
        std::fs::write(&good, DAILY_SCRIPT).unwrap();
        let unmailed = temp_dir.path().join("unmailed.sh");
        std::fs::write(&unmailed, JobScript::daily_fetch().render()).unwrap();

        assert!(JobScript::check_file(&good).is_ok());
        assert!(matches!(
            JobScript::check_file(&unmailed),
            Err(EtlError::MissingConfigError { .. })
        ));
        assert!(matches!(
            JobScript::check_file(temp_dir.path().join("missing.sh")),
            Err(EtlError::JobScriptError { line: 0, .. })
        ));
    }

    #[test]
    fn test_parse_missing_directive() {
        let content = DAILY_SCRIPT.replace("#SBATCH --mem=1G\n", "");
        let err = JobScript::parse(&content).unwrap_err();
        assert!(err.to_string().contains("--mem"));
    }

    #[test]
    fn test_time_limit_formats() {
        let secs = |s: &str| s.parse::<TimeLimit>().unwrap().as_secs();
        assert_eq!(secs("30"), 30 * 60);
        assert_eq!(secs("30:15"), 30 * 60 + 15);
        assert_eq!(secs("4:00:00"), 4 * 3600);
        assert_eq!(secs("1-0"), 86400);
        assert_eq!(secs("1-02:30"), 86400 + 2 * 3600 + 30 * 60);
        assert_eq!(secs("2-00:00:10"), 2 * 86400 + 10);
        assert!("".parse::<TimeLimit>().is_err());
        assert!("UNLIMITED".parse::<TimeLimit>().is_err());
        assert!("1-2:3:4:5".parse::<TimeLimit>().is_err());
        assert!("999999999999999999-0".parse::<TimeLimit>().is_err());
        assert!("1-18446744073709551615".parse::<TimeLimit>().is_err());
        assert!("18446744073709551615:00:00".parse::<TimeLimit>().is_err());

        assert_eq!("1-0".parse::<TimeLimit>().unwrap().to_string(), "24:00:00");
    }

    #[test]
    fn test_memory_size() {
        assert_eq!("1G".parse::<MemorySize>().unwrap(), MemorySize::gigabytes(1));
        assert_eq!(
            "512".parse::<MemorySize>().unwrap(),
            MemorySize { amount: 512, unit: MemoryUnit::M }
        );
        assert_eq!(
            "2048k".parse::<MemorySize>().unwrap(),
            MemorySize { amount: 2048, unit: MemoryUnit::K }
        );
        assert!("1X".parse::<MemorySize>().is_err());
        assert!("G".parse::<MemorySize>().is_err());
    }

    #[test]
    fn test_validate_presets() {
        assert!(JobScript::daily_fetch()
            .with_mail_user("reader@example.edu")
            .validate()
            .is_ok());
        // END/FAIL 通知需要收件人
        assert!(matches!(
            JobScript::daily_fetch().validate(),
            Err(EtlError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut script = JobScript::daily_fetch().with_mail_user("reader@example.edu");
        script.workdir = "book-rec".to_string();
        assert!(script.validate().is_err());

        let mut script = JobScript::daily_fetch().with_mail_user("reader@example.edu");
        script.directives.nodes = 0;
        assert!(script.validate().is_err());

        let mut script = JobScript::daily_fetch().with_mail_user("reader@example.edu");
        script.directives.mail_types = vec![MailType::None, MailType::End];
        assert!(script.validate().is_err());

        let mut script = JobScript::daily_fetch();
        script.directives.mail_types = vec![MailType::None];
        assert!(script.validate().is_ok());
    }
}
