use std::path::{Path, PathBuf};

use blockreg::{
    adapter, report, simulator, Agent, Config, Error, IdleAgent, Propagator, Regulator, Result,
    ScriptedAgent,
};
use log::{error, info};
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "blockreg")]
struct Opt {
    /// Simulator output (JSON)
    #[structopt(name = "FILE", parse(from_os_str))]
    input: Option<PathBuf>,

    /// Run this simulator command and read its output instead of FILE
    #[structopt(long, min_values = 1)]
    simulator: Vec<String>,

    #[structopt(long, parse(from_os_str))]
    infrastructure: Option<PathBuf>,

    /// Disturbances, stops and a scripted correction (JSON)
    #[structopt(long, parse(from_os_str))]
    scenario: Option<PathBuf>,

    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,

    #[structopt(long, default_value = "idle", possible_values = &["idle", "scripted"])]
    agent: String,

    /// Write the outcome as JSON
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,

    /// Print the block graph of the regulated schedule as a mermaid chart
    #[structopt(long)]
    mermaid: bool,

    /// Print the conflicts of every stage
    #[structopt(short, long)]
    verbose: bool,

    #[structopt(long)]
    profile: bool,
}

fn read(path: &Path) -> Result<String> {
    Ok(std::fs::read_to_string(path)?)
}

fn run(opt: &Opt) -> Result<()> {
    let config = match &opt.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let output_json = if !opt.simulator.is_empty() {
        simulator::run(&opt.simulator)?
    } else {
        let path = opt.input.as_ref().ok_or_else(|| {
            Error::AdapterMalformedInput("no simulator output given".to_string())
        })?;
        read(path)?
    };
    let infrastructure = match &opt.infrastructure {
        Some(path) => Some(adapter::parse_infrastructure(&read(path)?)?),
        None => None,
    };
    let scenario = match &opt.scenario {
        Some(path) => adapter::parse_scenario(&read(path)?)?,
        None => Default::default(),
    };

    let baseline = adapter::schedule_from_simulation(
        &adapter::parse_simulation(&output_json)?,
        infrastructure.as_ref(),
        &config.adapter,
    )?;
    let disturbances = adapter::lower_disturbances(&baseline, &scenario)?;
    info!("{} disturbances in scenario", disturbances.len());

    let agent: Box<dyn Agent> = match opt.agent.as_str() {
        "scripted" => Box::new(ScriptedAgent::new("scripted", scenario.regulation.clone())),
        _ => Box::new(IdleAgent),
    };

    let regulator = Regulator::new(Propagator::new(config.propagation.clone()));
    let outcome = regulator.regulate(&baseline, &disturbances, agent.as_ref())?;

    if opt.verbose {
        for (stage, schedule) in [
            ("nominal", &outcome.nominal),
            ("delayed", &outcome.delayed),
            ("regulated", &outcome.regulated),
        ] {
            let conflicts = schedule.conflicts();
            println!("{} schedule: {} conflicts", stage, conflicts.len());
            for c in conflicts.iter() {
                println!("  {}", c.describe(schedule));
            }
        }
    }

    print!("{}", report::arrival_table(&outcome));

    if opt.mermaid {
        print!("{}", outcome.regulated.mermaid());
    }

    if let Some(path) = &opt.output {
        let json = report::RegulationSummary::new(&outcome).to_json()?;
        std::fs::write(path, json)?;
        info!("Wrote {}", path.display());
    }
    Ok(())
}

pub fn main() {
    pretty_env_logger::init();
    let opt = Opt::from_args();

    hprof::start_frame();
    let result = run(&opt);
    hprof::end_frame();
    if opt.profile {
        hprof::profiler().print_timing();
    }

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}
