use std::fmt;

use rmx_kernel::availability::CapabilityRegistry;
use rmx_kernel::backends::Backend;

const AREA_WIDTH: usize = 20;
const OPERATION_WIDTH: usize = 24;
const CELL_WIDTH: usize = 13;

/// Fixed-width `area | operation | backends...` view of a registry.
#[derive(Debug, Clone, Copy)]
pub struct StatusTable<'r>(pub &'r CapabilityRegistry);

impl fmt::Display for StatusTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.0;
        write!(f, "{:<AREA_WIDTH$} | {:<OPERATION_WIDTH$}", "area", "operation")?;
        for backend in Backend::ALL {
            write!(f, " | {:^CELL_WIDTH$}", backend.as_str())?;
        }
        let rule = AREA_WIDTH + OPERATION_WIDTH + 3 + Backend::ALL.len() * (CELL_WIDTH + 3);
        writeln!(f)?;
        writeln!(f, "{}", "-".repeat(rule))?;

        for (area, operations) in registry.snapshot() {
            for (operation, row) in operations {
                write!(f, "{area:<AREA_WIDTH$} | {operation:<OPERATION_WIDTH$}")?;
                for backend in Backend::ALL {
                    let symbol = row.get(&backend).map_or("No", |status| status.symbol());
                    write!(f, " | {symbol:^CELL_WIDTH$}")?;
                }
                writeln!(f)?;
            }
        }

        writeln!(f)?;
        writeln!(f, "Yes: supported | No: not compiled or not implemented | Error: self-test failed")?;
        for backend in Backend::ALL {
            let tier = registry.tier(backend);
            if !tier.is_supported() {
                writeln!(f, "{backend}: {tier}")?;
            }
        }
        Ok(())
    }
}

/// Renders the registry as a fixed-width `area | operation | backends...` table.
pub fn render_status(registry: &CapabilityRegistry) -> String {
    StatusTable(registry).to_string()
}
