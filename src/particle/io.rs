//! ASCII particle input
//!
//! One particle per line: `mass x y z vx vy vz [radius]`. Blank lines and
//! lines starting with `#` are skipped. Particle ids follow input order.

use std::io::BufRead;

use super::Particle;
use crate::{Error, Result};

/// Read particles from a whitespace-separated ASCII table.
///
/// # Errors
///
/// Returns [`Error::Parse`] with the 1-based line number when a line has
/// the wrong number of columns or a non-numeric value, and [`Error::Io`]
/// when reading fails.
pub fn read_ascii<R: BufRead>(reader: R) -> Result<Vec<Particle>> {
    let mut particles = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let values = trimmed
            .split_whitespace()
            .map(|field| {
                field.parse::<f64>().map_err(|e| Error::Parse {
                    line: line_no,
                    message: format!("invalid number `{field}`: {e}"),
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        if values.len() != 7 && values.len() != 8 {
            return Err(Error::Parse {
                line: line_no,
                message: format!("expected 7 or 8 columns, found {}", values.len()),
            });
        }
        if values[0] < 0.0 {
            return Err(Error::Parse {
                line: line_no,
                message: format!("negative mass {}", values[0]),
            });
        }

        let id = i64::try_from(particles.len()).map_err(|e| Error::Other(e.to_string()))?;
        let mut particle = Particle::new(
            id,
            values[0],
            [values[1], values[2], values[3]],
            [values[4], values[5], values[6]],
        );
        if let Some(radius) = values.get(7) {
            particle.radius = *radius;
        }
        particles.push(particle);
    }
    Ok(particles)
}
