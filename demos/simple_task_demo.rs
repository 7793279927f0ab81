use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    conveyor::demo_apps::run_simple_task_demo(std::env::args().skip(1))
}
