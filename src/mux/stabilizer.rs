use std::collections::HashMap;

const TS_HZ: i64 = 90;

/// Maps wall-clock access-unit times onto a monotonic TS timebase.
///
/// One PID is the primary clock source; its timestamps anchor the session.
/// Secondary PIDs get a PTS estimated from the elapsed wall-clock time since
/// the primary's last unit, with a per-PID ceiling so estimates never run
/// backwards.
#[derive(Debug)]
pub struct PtsStabilizer {
    primary_pid: u16,
    first_pts: Option<i64>,
    last_pts: i64,
    last_time_ms: i64,
    last_pts_of_pid: HashMap<u16, i64>,
}

impl PtsStabilizer {
    /// New stabilizer anchored on `primary_pid`.
    pub fn new(primary_pid: u16) -> Self {
        Self {
            primary_pid,
            first_pts: None,
            last_pts: 0,
            last_time_ms: 0,
            last_pts_of_pid: HashMap::new(),
        }
    }

    /// The PID whose timestamps anchor the session.
    pub fn primary_pid(&self) -> u16 {
        self.primary_pid
    }

    /// Computes the output PTS for a primary-PID access unit.
    ///
    /// The first call latches the session origin; every call records the
    /// input as the reference point for secondary-PID estimates. Input in
    /// milliseconds, output in TS ticks.
    pub fn compute_primary_pts(&mut self, pts: i64, now_ms: i64) -> i64 {
        let first = *self.first_pts.get_or_insert(pts);
        self.last_pts = pts;
        self.last_time_ms = now_ms;
        (pts - first) / 1000 * TS_HZ
    }

    /// Computes the output PTS for a secondary-PID access unit from elapsed
    /// wall-clock time.
    pub fn compute_pts(&mut self, pid: u16, now_ms: i64) -> i64 {
        let pts = if now_ms > self.last_time_ms {
            self.last_pts + (now_ms - self.last_time_ms)
        } else {
            self.last_pts - (self.last_time_ms - now_ms)
        };

        let ceiling = self.last_pts_of_pid.entry(pid).or_insert(0);
        if pts > *ceiling {
            *ceiling = pts;
        }

        (pts - self.first_pts.unwrap_or(0)) / 1000 * TS_HZ
    }
}
