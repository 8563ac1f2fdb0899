//! Single-byte and status commands

use mramctl_core::protocol::StatusRegister;
use mramctl_core::router::{ChipRouter, ChipSelector};
use mramctl_core::transport::TransportOpener;

/// Read one byte and print it
pub fn run_read<O: TransportOpener>(
    router: &mut ChipRouter<O>,
    selector: ChipSelector,
    address: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let value = router.with_chip(selector, |mram| mram.read_byte(address))??;
    println!("0x{:06X}: 0x{:02X}", address, value);
    Ok(())
}

/// Write one byte
pub fn run_write<O: TransportOpener>(
    router: &mut ChipRouter<O>,
    selector: ChipSelector,
    address: u32,
    value: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    router.with_chip(selector, |mram| mram.write_byte(address, value))??;
    println!("Wrote 0x{:02X} to 0x{:06X} on {}", value, address, selector);
    Ok(())
}

/// Read and decode the status register
pub fn run_status<O: TransportOpener>(
    router: &mut ChipRouter<O>,
    selector: ChipSelector,
) -> Result<(), Box<dyn std::error::Error>> {
    let status = router.with_chip(selector, |mram| mram.read_status_register())??;
    print!("{}", describe_status(selector, status));
    Ok(())
}

fn describe_status(selector: ChipSelector, status: StatusRegister) -> String {
    let flag = |set: bool| if set { "set" } else { "clear" };
    format!(
        "Status register ({}): 0x{:02X}\n  \
         WEL  (write enable latch):     {}\n  \
         BP   (block protection):       {}\n  \
         SRWD (status write disable):   {}\n",
        selector,
        status.bits(),
        flag(status.write_enabled()),
        status.block_protection(),
        flag(status.contains(StatusRegister::SRWD)),
    )
}
