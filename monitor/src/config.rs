//! Key/value config file loading
//!
//! The file holds `key = value` lines; `#` starts a comment line. Keys are matched
//! case-insensitively against a fixed table of options, unknown keys are skipped.

use crate::error::ConfigError;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Marker in welcome/farewell templates replaced by the player's name
pub const NAME_MARKER: &str = "@";

/// Fully resolved monitor settings
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub query_port: u16,
    pub rcon_port: u16,
    pub rcon_password: String,
    pub template_welcome: String,
    pub template_farewell: String,
    pub rule_file: PathBuf,
    pub bot_token: String,
    pub channel_id: String,
    pub message_id_file: PathBuf,
    pub first_rule_delay: Duration,
    pub next_rule_delay: Duration,
    pub exit_on_auth_failure: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: String::new(),
            query_port: 27131,
            rcon_port: 27015,
            rcon_password: String::new(),
            template_welcome: "Welcome, @!".to_string(),
            template_farewell: "Player @ just left.".to_string(),
            rule_file: PathBuf::from("rules.txt"),
            bot_token: String::new(),
            channel_id: String::new(),
            message_id_file: PathBuf::from("message.id"),
            first_rule_delay: Duration::from_secs(30),
            next_rule_delay: Duration::from_secs(10),
            exit_on_auth_failure: true,
        }
    }
}

fn parse_num<T: std::str::FromStr>(value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("\"{}\" is not a valid number", value))
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(format!("\"{}\" is not a valid boolean", value)),
    }
}

/// Option name to field assignment, one arm per accepted key
///
/// Returns `Ok(false)` for unknown keys.
fn apply_option(config: &mut Config, key: &str, value: &str) -> Result<bool, String> {
    match key {
        "host" => config.host = value.to_string(),
        "queryport" => config.query_port = parse_num(value)?,
        "rconport" => config.rcon_port = parse_num(value)?,
        "rconpassword" => config.rcon_password = value.to_string(),
        "templatewelcome" => config.template_welcome = value.to_string(),
        "templatefarewell" => config.template_farewell = value.to_string(),
        "rulefile" | "rulesfile" => config.rule_file = PathBuf::from(value),
        "bottoken" => config.bot_token = value.to_string(),
        "channelid" => config.channel_id = value.to_string(),
        "messageidfile" => config.message_id_file = PathBuf::from(value),
        "tellfirstruledelay" => config.first_rule_delay = Duration::from_secs(parse_num(value)?),
        "tellnextrulesdelay" => config.next_rule_delay = Duration::from_secs(parse_num(value)?),
        "exitonauthfailure" => config.exit_on_auth_failure = parse_bool(value)?,
        _ => return Ok(false),
    }
    Ok(true)
}

impl Config {
    /// Parses config text on top of the defaults
    ///
    /// Does not check required fields, see [`Config::validate`].
    pub fn parse(text: &str) -> Self {
        let mut config = Config::default();

        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match apply_option(&mut config, &key, value) {
                Ok(true) => {}
                Ok(false) => debug!("Config line {}: unknown option {}", line_no + 1, key),
                Err(e) => warn!("Config line {}: {}: {}, keeping default", line_no + 1, key, e),
            }
        }

        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingHost);
        }
        Ok(())
    }

    /// Reads, parses and validates a config file
    ///
    /// Relative rule and message-id paths are taken relative to the config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let mut config = Self::parse(&text);
        config.validate()?;

        if let Some(dir) = path.parent() {
            config.rule_file = dir.join(&config.rule_file);
            config.message_id_file = dir.join(&config.message_id_file);
        }
        Ok(config)
    }

    /// Whether a notification channel is configured
    pub fn notifications_enabled(&self) -> bool {
        !self.bot_token.is_empty() && !self.channel_id.is_empty()
    }
}

/// Replaces every name marker in `template` with `name`
pub fn fill_template(template: &str, name: &str) -> String {
    template.replace(NAME_MARKER, name)
}

/// Annotated example printed by `--example-config`
pub const EXAMPLE_CONFIG: &str = r#"# hostname or ip of your server
host                = my.fancy.server

# server's query port
queryPort           = 27131

# server's RCON port
rconPort            = 27015

# RCON password
rconPassword        = supersecret

# welcome message, @ is replaced with players name
templateWelcome     = Welcome, @!

# farewell message
templateFarewell    = Player @ just left.

# rules file, one rule per line
rulesFile           = rules.txt

# delay until first rule is printed in seconds
tellFirstRuleDelay  = 30

# delay between every rule in seconds
tellNextRulesDelay  = 10

# stop monitoring when the RCON password is rejected
exitOnAuthFailure   = true

# optional Telegram channel summary
# botToken          = 123456:ABC-DEF
# channelId         = @my_channel
# messageIdFile     = message.id
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::parse("");
        assert_eq!(config, Config::default());
        assert_eq!(config.query_port, 27131);
        assert_eq!(config.rcon_port, 27015);
        assert_eq!(config.first_rule_delay, Duration::from_secs(30));
        assert_eq!(config.next_rule_delay, Duration::from_secs(10));
        assert!(config.exit_on_auth_failure);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_all_options() {
        let text = "\
            Host = 10.0.0.5\n\
            QUERYPORT=27200\n\
            rconPort = 27016\n\
            rconPassword = a=b=c\n\
            templateWelcome = Hi @, welcome @!\n\
            templateFarewell = Bye @\n\
            ruleFile = my_rules.txt\n\
            botToken = 1:abc\n\
            channelId = @chan\n\
            messageIdFile = state/msg.id\n\
            tellFirstRuleDelay = 45\n\
            tellNextRulesDelay = 3\n\
            exitOnAuthFailure = no\n";
        let config = Config::parse(text);

        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.query_port, 27200);
        assert_eq!(config.rcon_port, 27016);
        assert_eq!(config.rcon_password, "a=b=c");
        assert_eq!(config.template_welcome, "Hi @, welcome @!");
        assert_eq!(config.template_farewell, "Bye @");
        assert_eq!(config.rule_file, PathBuf::from("my_rules.txt"));
        assert_eq!(config.message_id_file, PathBuf::from("state/msg.id"));
        assert_eq!(config.first_rule_delay, Duration::from_secs(45));
        assert_eq!(config.next_rule_delay, Duration::from_secs(3));
        assert!(!config.exit_on_auth_failure);
        assert!(config.notifications_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_comments_blank_and_unknown_lines() {
        let text = "# host = commented\n\n   \nnot a pair\nfoo = bar\nhost = real\n";
        let config = Config::parse(text);
        assert_eq!(config.host, "real");
    }

    #[test]
    fn test_bad_numbers_keep_defaults() {
        let config = Config::parse("host=h\nqueryport = lots\nrconport = 70000\ntellfirstruledelay = -1\n");
        assert_eq!(config.query_port, 27131);
        assert_eq!(config.rcon_port, 27015);
        assert_eq!(config.first_rule_delay, Duration::from_secs(30));
    }

    #[test]
    fn test_notifications_need_token_and_channel() {
        assert!(!Config::parse("bottoken = x").notifications_enabled());
        assert!(!Config::parse("channelid = y").notifications_enabled());
    }

    #[test]
    fn test_fill_template() {
        assert_eq!(fill_template("Welcome, @!", "Alice"), "Welcome, Alice!");
        assert_eq!(fill_template("@ and @", "Bob"), "Bob and Bob");
        assert_eq!(fill_template("no marker", "Bob"), "no marker");
    }

    #[test]
    fn test_example_config_is_valid() {
        let config = Config::parse(EXAMPLE_CONFIG);
        assert_eq!(config.host, "my.fancy.server");
        assert_eq!(config.rcon_password, "supersecret");
        assert!(config.validate().is_ok());
        assert!(!config.notifications_enabled());
    }

    #[test]
    fn test_load_resolves_paths_next_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("isr.cfg");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "host = example.org\nrulesfile = rules.txt").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.host, "example.org");
        assert_eq!(config.rule_file, dir.path().join("rules.txt"));
        assert_eq!(config.message_id_file, dir.path().join("message.id"));
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.cfg");
        assert!(matches!(
            Config::load(&missing),
            Err(ConfigError::NotFound(_))
        ));

        let no_host = dir.path().join("empty.cfg");
        std::fs::write(&no_host, "rconport = 1\n").unwrap();
        assert!(matches!(
            Config::load(&no_host),
            Err(ConfigError::MissingHost)
        ));
    }
}
