use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    conveyor::demo_apps::run_multipath_demo(std::env::args().skip(1))
}
