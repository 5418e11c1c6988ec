use clap::Subcommand;
use roundbell_core::Preset;

#[derive(Subcommand)]
pub enum PresetAction {
    /// List presets with their durations
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one preset's configuration as JSON
    Show {
        /// Preset name (beginner, intermediate, advanced)
        name: String,
    },
}

pub fn run(action: PresetAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        PresetAction::List { json: true } => {
            let presets: Vec<_> = Preset::ALL
                .iter()
                .map(|p| serde_json::json!({ "name": p.name(), "config": p.config() }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&presets)?);
        }
        PresetAction::List { json: false } => {
            for preset in Preset::ALL {
                let c = preset.config();
                println!(
                    "{:<13} {:>2} rounds  {:>3}s work  {:>3}s rest  {:>2}s prep",
                    preset.name(),
                    c.total_rounds,
                    c.work_duration,
                    c.rest_duration,
                    c.prep_duration
                );
            }
        }
        PresetAction::Show { name } => {
            let preset: Preset = name.parse()?;
            println!("{}", serde_json::to_string_pretty(&preset.config())?);
        }
    }
    Ok(())
}
