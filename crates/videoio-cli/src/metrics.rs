// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use serde::Serialize;
use std::time::Instant;

/// Transfer metrics collected during playout or capture
#[derive(Debug, Clone, Serialize)]
pub struct FrameMetrics {
    /// Frames moved across the DMA engine
    pub frames_transferred: u64,
    /// Total bytes transferred
    pub bytes_transferred: u64,
    /// Total duration in milliseconds
    pub duration_ms: u64,
    /// Average throughput in frames per second
    pub throughput_fps: f64,
    /// Average bandwidth in megabits per second
    pub bandwidth_mbps: f64,
    /// Minimum frame cycle time in microseconds
    pub cycle_min_us: u64,
    /// Maximum frame cycle time in microseconds
    pub cycle_max_us: u64,
    /// Average frame cycle time in microseconds
    pub cycle_avg_us: u64,
    /// 50th percentile (median) frame cycle time in microseconds
    pub cycle_p50_us: u64,
    /// 95th percentile frame cycle time in microseconds
    pub cycle_p95_us: u64,
    /// 99th percentile frame cycle time in microseconds
    pub cycle_p99_us: u64,
    /// Transfers the driver refused
    pub rejected_transfers: u64,
    /// Frames lost between vertical blanks
    pub dropped_frames: u64,
}

/// Metrics collector for tracking DMA transfer performance
pub struct MetricsCollector {
    start_time: Instant,
    cycles_us: Vec<u64>,
    bytes: u64,
    rejected: u64,
    dropped_frames: u64,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            cycles_us: Vec::new(),
            bytes: 0,
            rejected: 0,
            dropped_frames: 0,
        }
    }

    /// Record one completed transfer and the time its cycle took
    pub fn record_frame(&mut self, bytes: usize, cycle_us: u64) {
        self.bytes += bytes as u64;
        self.cycles_us.push(cycle_us);
    }

    /// Record a transfer the driver refused
    pub fn record_rejected(&mut self) {
        self.rejected += 1;
    }

    /// Record frames reported lost by a vertical blank wait
    pub fn record_dropped(&mut self, frames: u64) {
        self.dropped_frames += frames;
    }

    /// Finalize and calculate all metrics
    pub fn finalize(&mut self) -> FrameMetrics {
        let duration = self.start_time.elapsed();
        let duration_ms = duration.as_millis() as u64;
        let duration_secs = duration.as_secs_f64();

        let frames_transferred = self.cycles_us.len() as u64;

        let throughput_fps = if duration_secs > 0.0 {
            frames_transferred as f64 / duration_secs
        } else {
            0.0
        };

        let bandwidth_mbps = if duration_secs > 0.0 {
            (self.bytes as f64 * 8.0) / (duration_secs * 1_000_000.0)
        } else {
            0.0
        };

        self.cycles_us.sort_unstable();
        let (min_us, max_us, avg_us) = match (self.cycles_us.first(), self.cycles_us.last()) {
            (Some(&min), Some(&max)) => {
                let sum: u64 = self.cycles_us.iter().sum();
                (min, max, sum / self.cycles_us.len() as u64)
            }
            _ => (0, 0, 0),
        };

        FrameMetrics {
            frames_transferred,
            bytes_transferred: self.bytes,
            duration_ms,
            throughput_fps,
            bandwidth_mbps,
            cycle_min_us: min_us,
            cycle_max_us: max_us,
            cycle_avg_us: avg_us,
            cycle_p50_us: self.percentile(50.0),
            cycle_p95_us: self.percentile(95.0),
            cycle_p99_us: self.percentile(99.0),
            rejected_transfers: self.rejected,
            dropped_frames: self.dropped_frames,
        }
    }

    /// Percentile of the cycle times; expects them sorted
    fn percentile(&self, p: f64) -> u64 {
        if self.cycles_us.is_empty() {
            return 0;
        }

        let len = self.cycles_us.len();
        let idx = ((p / 100.0) * (len - 1) as f64).round() as usize;
        self.cycles_us[idx.min(len - 1)]
    }

    /// Print metrics in human-readable format
    pub fn print_text(&mut self) {
        let metrics = self.finalize();
        println!("\n=== Transfer Metrics ===");
        println!("Frames transferred: {}", metrics.frames_transferred);
        println!(
            "Bytes transferred:  {} ({:.2} MB)",
            metrics.bytes_transferred,
            metrics.bytes_transferred as f64 / 1_048_576.0
        );
        println!(
            "Duration:           {:.2} s",
            metrics.duration_ms as f64 / 1000.0
        );
        println!("Throughput:         {:.2} fps", metrics.throughput_fps);
        println!("Bandwidth:          {:.2} Mbps", metrics.bandwidth_mbps);

        if metrics.frames_transferred > 0 {
            println!("\nFrame Cycle (µs):");
            println!("  Min:    {}", metrics.cycle_min_us);
            println!("  Max:    {}", metrics.cycle_max_us);
            println!("  Avg:    {}", metrics.cycle_avg_us);
            println!("  P50:    {}", metrics.cycle_p50_us);
            println!("  P95:    {}", metrics.cycle_p95_us);
            println!("  P99:    {}", metrics.cycle_p99_us);
        }

        if metrics.rejected_transfers > 0 {
            println!("\nRejected transfers: {}", metrics.rejected_transfers);
        }
        if metrics.dropped_frames > 0 {
            let total = metrics.frames_transferred + metrics.dropped_frames;
            println!(
                "\nDropped frames:     {} ({:.2}%)",
                metrics.dropped_frames,
                (metrics.dropped_frames as f64 / total as f64) * 100.0
            );
        }
    }

    /// Print metrics in JSON format
    pub fn print_json(&mut self) -> Result<(), serde_json::Error> {
        let metrics = self.finalize();
        let json = serde_json::to_string_pretty(&metrics)?;
        println!("{}", json);
        Ok(())
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
