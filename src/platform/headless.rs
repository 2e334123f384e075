use std::time::{Duration, Instant};

use clap::{App, AppSettings, Arg, SubCommand};

use crate::{
    simulation_parameters::{SceneConfig, SimulationParams},
    write_statistics, FluidSystem,
};

const CARGO_PKG_AUTHORS: &'static str = env!("CARGO_PKG_AUTHORS");
const CARGO_PKG_VERSION: &'static str = env!("CARGO_PKG_VERSION");
const CARGO_PKG_DESCRIPTION: &'static str = env!("CARGO_PKG_DESCRIPTION");

pub fn start() {
    let matches = App::new("PBF Fluid Simulation")
        .version(CARGO_PKG_VERSION)
        .author(CARGO_PKG_AUTHORS)
        .about(CARGO_PKG_DESCRIPTION)
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("run")
                .about("Run the simulation headlessly and report per-frame timings")
                .arg(
                    Arg::with_name("SIMULATION_CONFIG")
                        .long("simulation-config")
                        .short("c")
                        .takes_value(true)
                        .help("YAML file with the solver parameters (defaults used when omitted)"),
                )
                .arg(
                    Arg::with_name("SCENE_CONFIG")
                        .long("scene-config")
                        .short("s")
                        .takes_value(true)
                        .help("YAML file with the box extents and seed blocks (defaults used when omitted)"),
                )
                .arg(
                    Arg::with_name("MAX_FRAMES")
                        .long("max-frames")
                        .short("n")
                        .takes_value(true)
                        .help("Stop the simulation after the given number of frames"),
                )
                .arg(
                    Arg::with_name("WAVES")
                        .long("waves")
                        .takes_value(false)
                        .help("Animate the +x wall with a piston-like wave motion"),
                )
                .arg(
                    Arg::with_name("STATISTICS_ENABLED")
                        .long("statistics-enabled")
                        .short("p")
                        .takes_value(false)
                        .help("Track performance of individual steps"),
                ),
        )
        .get_matches();

    if let Some(run_matches) = matches.subcommand_matches("run") {
        let simulation_params: SimulationParams = match run_matches.value_of("SIMULATION_CONFIG") {
            Some(parameter_file) => {
                let params_yaml =
                    std::fs::read_to_string(parameter_file).expect("failed reading parameter file");
                serde_yaml::from_str(&params_yaml).expect("failed parsing simulation config file")
            }
            None => SimulationParams::default(),
        };
        println!("{:?}", simulation_params);

        let scene_config: SceneConfig = match run_matches.value_of("SCENE_CONFIG") {
            Some(scene_file) => {
                let scene_yaml = std::fs::read_to_string(scene_file).expect("failed reading scene file");
                serde_yaml::from_str(&scene_yaml).expect("failed parsing scene config file")
            }
            None => SceneConfig::default(),
        };
        println!("{:?}", scene_config);

        let max_frames = run_matches
            .value_of("MAX_FRAMES")
            .map(|x| x.parse::<usize>().expect("invalid frame count"))
            .unwrap_or(600);
        let waves = run_matches.is_present("WAVES");
        let counters_enabled = run_matches.is_present("STATISTICS_ENABLED");

        run_simulation(simulation_params, &scene_config, waves, max_frames, counters_enabled);
    } else {
        unreachable!()
    }
}

fn run_simulation(
    simulation_params: SimulationParams,
    scene_config: &SceneConfig,
    waves: bool,
    max_frames: usize,
    counters_enabled: bool,
) {
    let mut fluid_system = FluidSystem::new(simulation_params, scene_config, counters_enabled);
    fluid_system.set_simulate(true);
    fluid_system.set_waves(waves);

    let mut total_duration: Duration = Duration::from_nanos(0);

    for frame_number in 0..max_frames {
        let a = Instant::now();
        fluid_system.single_step();
        let b = Instant::now();

        total_duration += b - a;

        println!(
            "{:05}: {} fluid particles {:.2}msec ({:.2}msec AVG)",
            frame_number,
            fluid_system.num_particles(),
            (b - a).as_secs_f32() * 1000.,
            (total_duration / (frame_number as u32 + 1)).as_secs_f32() * 1000.
        );
    }

    if counters_enabled {
        print!("{}", write_statistics(&fluid_system));
    }
}
