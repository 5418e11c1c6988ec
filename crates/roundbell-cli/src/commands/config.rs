use clap::Subcommand;
use roundbell_core::storage::settings_path;
use roundbell_core::Settings;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a settings value
    Get {
        /// Dot-separated key (e.g. "timer.work_duration", "audio.volume")
        key: String,
    },
    /// Set a settings value
    Set {
        /// Dot-separated key
        key: String,
        /// New value
        value: String,
    },
    /// List all settings values
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Reset settings to defaults
    Reset,
    /// Print the settings file location
    Path,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let settings = Settings::load()?;
            match settings.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut settings = Settings::load()?;
            settings.set(&key, &value)?;
            settings.save()?;
            println!("ok");
        }
        ConfigAction::List { json: true } => {
            let settings = Settings::load()?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        ConfigAction::List { json: false } => {
            for (key, value) in Settings::load()?.entries() {
                println!("{key} = {value}");
            }
        }
        ConfigAction::Reset => {
            let path = Settings::default().save()?;
            println!("settings reset to defaults ({})", path.display());
        }
        ConfigAction::Path => println!("{}", settings_path().display()),
    }
    Ok(())
}
