use clap::Args;
use roundbell_core::{
    cues_for, EngineOptions, ErrorKind, EventKind, Preset, Settings, TimerConfig,
    TimerConfigPatch, TimerEngine, TimerEvent,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[derive(Args)]
pub struct RunArgs {
    /// Start from a preset instead of the settings file
    #[arg(long)]
    preset: Option<String>,
    /// Number of rounds
    #[arg(long)]
    rounds: Option<u32>,
    /// Work phase length in seconds
    #[arg(long)]
    work: Option<u32>,
    /// Rest phase length in seconds
    #[arg(long)]
    rest: Option<u32>,
    /// Preparation length in seconds (0 to skip)
    #[arg(long)]
    prep: Option<u32>,
    /// Warning threshold in seconds before each phase ends
    #[arg(long)]
    warning: Option<u32>,
    /// Disable the end-of-phase warning
    #[arg(long)]
    no_warning: bool,
    /// Scheduler tick interval in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,
    /// Include audio cues with each event
    #[arg(long)]
    cues: bool,
}

impl RunArgs {
    fn patch(&self) -> TimerConfigPatch {
        TimerConfigPatch {
            total_rounds: self.rounds,
            work_duration: self.work,
            rest_duration: self.rest,
            prep_duration: self.prep,
            enable_warning: self.no_warning.then_some(false),
            warning_threshold: self.warning,
        }
    }

    fn resolve(&self) -> Result<(TimerConfig, EngineOptions), Box<dyn std::error::Error>> {
        let settings = Settings::load()?;
        let base = match &self.preset {
            Some(name) => name.parse::<Preset>()?.config(),
            None => settings.timer_config()?,
        };
        let config = base.merged(&self.patch())?;
        let options = match self.tick_ms {
            Some(ms) => EngineOptions::with_tick_interval_ms(ms)?,
            None => settings.engine_options()?,
        };
        Ok((config, options))
    }
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (config, options) = args.resolve()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_workout(config, options, args.cues))
}

async fn run_workout(
    config: TimerConfig,
    options: EngineOptions,
    with_cues: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = TimerEngine::new(config, options)?;
    let mut events = engine.events();
    engine.start()?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => {
                    print_event(&event, with_cues)?;
                    match &event.kind {
                        EventKind::WorkoutComplete { .. } | EventKind::Stopped => break,
                        EventKind::Error { kind: ErrorKind::EngineUnavailable, message, .. } => {
                            return Err(message.clone().into());
                        }
                        EventKind::Error { message, command: Some(command), .. }
                            if command == "start" =>
                        {
                            return Err(message.clone().into());
                        }
                        _ => {}
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event stream lagged"),
                Err(RecvError::Closed) => break,
            },
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                info!("interrupted, stopping workout");
                engine.stop()?;
            }
        }
    }
    Ok(())
}

fn print_event(event: &TimerEvent, with_cues: bool) -> Result<(), serde_json::Error> {
    let mut value = serde_json::to_value(event)?;
    if with_cues {
        let cues = cues_for(event);
        if let Some(obj) = value.as_object_mut() {
            obj.insert("cues".to_string(), serde_json::to_value(cues)?);
        }
    }
    println!("{}", serde_json::to_string(&value)?);
    Ok(())
}
