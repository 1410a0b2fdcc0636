//! Check command implementation

use eprom_host::{Backend, Transport};

/// Identify the programmer and print what it reports
pub fn run_check<T: Transport>(backend: &mut Backend<T>) -> Result<(), Box<dyn std::error::Error>> {
    let ident = backend.identify()?;
    println!("Programmer: {}", ident);
    println!("Backend is ready!");
    Ok(())
}
