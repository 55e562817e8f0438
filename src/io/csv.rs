use std::io::{self, Write};
use std::path::Path;

use crate::sim::Sample;

/// Write per-tick flight samples in CSV format.
///
/// Columns: time, x, y, vx, vy, angle_deg, angular_vel,
///          fuel_main, fuel_aux, main, left, right, left_gimbal, right_gimbal,
///          phase, landed, crashed
pub fn write_trajectory<W: Write>(writer: &mut W, samples: &[Sample]) -> io::Result<()> {
    writeln!(
        writer,
        "time,x,y,vx,vy,angle_deg,angular_vel,\
         fuel_main,fuel_aux,main,left,right,left_gimbal,right_gimbal,\
         phase,landed,crashed"
    )?;

    for s in samples {
        let st = &s.state;
        let c = &s.command;
        writeln!(
            writer,
            "{:.4},{:.4},{:.4},{:.4},{:.4},{:.3},{:.5},\
             {:.3},{:.3},{:.4},{:.4},{:.4},{:.5},{:.5},\
             {},{},{}",
            s.time,
            st.pos.x, st.pos.y,
            st.vel.x, st.vel.y,
            st.angle.to_degrees(),
            st.angular_vel,
            st.fuel_main,
            st.aux_tanks.iter().sum::<f64>(),
            c.main, c.left, c.right,
            c.left_gimbal, c.right_gimbal,
            s.phase,
            st.landed as u8,
            st.crashed as u8,
        )?;
    }

    Ok(())
}

/// Write samples to a CSV file at the given path.
pub fn write_trajectory_file<P: AsRef<Path>>(path: P, samples: &[Sample]) -> io::Result<()> {
    let mut file = io::BufWriter::new(std::fs::File::create(path)?);
    write_trajectory(&mut file, samples)?;
    file.flush()
}
