use std::collections::HashMap;
use std::path::Path;

use crate::subprocess::ProcessCommand;

pub struct ProcessCommandBuilder {
    command: ProcessCommand,
}

impl ProcessCommandBuilder {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            command: ProcessCommand {
                program: program.as_ref().to_path_buf(),
                args: Vec::new(),
                env: HashMap::new(),
            },
        }
    }

    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.command.args.push(arg.as_ref().to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.command
            .args
            .extend(args.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<str>) -> Self {
        self.command
            .env
            .insert(key.to_string(), value.as_ref().to_string());
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            self.command
                .env
                .insert(key.as_ref().to_string(), value.as_ref().to_string());
        }
        self
    }

    pub fn build(self) -> ProcessCommand {
        self.command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_args_and_env() {
        let cmd = ProcessCommandBuilder::new("/usr/bin/python")
            .arg("yt-dlp")
            .args(["--dump-json", "https://example.com/v"])
            .env("HOME", "/data/python")
            .envs([("TMPDIR", "/data/tmp")])
            .build();

        assert_eq!(cmd.program, Path::new("/usr/bin/python"));
        assert_eq!(cmd.args, vec!["yt-dlp", "--dump-json", "https://example.com/v"]);
        assert_eq!(cmd.env.get("HOME").map(String::as_str), Some("/data/python"));
        assert_eq!(cmd.env.get("TMPDIR").map(String::as_str), Some("/data/tmp"));
    }

    #[test]
    fn test_later_env_value_wins() {
        let cmd = ProcessCommandBuilder::new("sh")
            .env("PATH", "/bin")
            .env("PATH", "/usr/bin")
            .build();
        assert_eq!(cmd.env.get("PATH").map(String::as_str), Some("/usr/bin"));
    }
}
