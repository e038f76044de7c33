use crate::cmd::PortsArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_ports, OutputFormat, PortOutput};

#[cfg(feature = "serial")]
pub fn run(_args: PortsArgs, format: OutputFormat) -> CliResult<i32> {
    use irlink_transport::SerialTransport;

    use crate::exit::transport_error;

    let ports = SerialTransport::available_ports()
        .map_err(|err| transport_error("port enumeration failed", err))?;
    tracing::debug!(count = ports.len(), "serial ports enumerated");

    let ports: Vec<PortOutput> = ports
        .into_iter()
        .map(|port| PortOutput {
            name: port.name,
            description: port.description,
        })
        .collect();
    print_ports(&ports, format);
    Ok(SUCCESS)
}

#[cfg(not(feature = "serial"))]
pub fn run(_args: PortsArgs, format: OutputFormat) -> CliResult<i32> {
    tracing::warn!("built without serial support, no ports to list");
    print_ports(&[], format);
    Ok(SUCCESS)
}
