use clap::Parser;

/// wifibat-bridge - polls WiFi battery units and republishes their readings to MQTT
#[derive(Debug, Parser)]
#[clap(author, version)]
pub struct Options {
    /// Config file to read
    #[clap(short = 'c', long = "config", default_value = "config.yaml")]
    pub config_file: String,

    /// Run a single poll cycle and exit, even if poll_interval_secs is configured
    #[clap(long = "once")]
    pub once: bool,
}

impl Options {
    pub fn new() -> Self {
        Self::parse()
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            config_file: "config.yaml".to_string(),
            once: false,
        }
    }
}
