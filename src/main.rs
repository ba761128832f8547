use std::path::PathBuf;
use std::time::*;
use std::{env, io, process};

fn main() -> io::Result<()> {
    env_logger::init();
    let config_path = env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("postrack.json"));
    let config = match postrack::config::load_or_create(&config_path) {
        Ok(config) => config,
        Err(e) => {
            log::error!("cannot read config {}: {e}", config_path.display());
            process::exit(1);
        }
    };

    let mut world = postrack::World::new(&config)?;
    world.load_positions()?;
    let mut network = postrack::Network::new(&config.listen_addr)?;

    let starttime = Instant::now();
    while !world.stopping() {
        let next_tick_due = starttime + world.next_tick() * Duration::from_millis(50);
        network.process_packets_until(next_tick_due, &mut world);

        let time_passed_in_ticks = (Instant::now() - starttime).as_millis() / 50;
        world.tick_until(time_passed_in_ticks as u32, network.inboxes());
    }
    world.save_positions()
}
