// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Video mode listing, grouped by raster and frame rate.

use crate::error::CliError;
use clap::Args as ClapArgs;
use serde::Serialize;
use videoio::mode::{enumerate_formats, FormatGroup};

#[derive(ClapArgs, Debug)]
pub struct Args {
    /// Only list rasters of this width
    #[arg(long)]
    width: Option<u32>,
}

#[derive(Debug, Serialize)]
struct RasterEntry {
    width: u32,
    height: u32,
    rates: Vec<RateEntry>,
}

#[derive(Debug, Serialize)]
struct RateEntry {
    fps: String,
    frame_rate: [u32; 2],
    modes: Vec<ModeEntry>,
}

#[derive(Debug, Serialize)]
struct ModeEntry {
    name: &'static str,
    interlaced: bool,
    frame_size: usize,
}

pub fn execute(args: Args, json: bool) -> Result<(), CliError> {
    log::debug!("Executing modes command: {:?}", args);

    let groups: Vec<FormatGroup> = enumerate_formats()
        .into_iter()
        .filter(|g| args.width.map_or(true, |w| g.width == w))
        .collect();
    if groups.is_empty() {
        return Err(CliError::InvalidArgs(format!(
            "no video modes with width {}",
            args.width.unwrap_or_default()
        )));
    }

    let entries: Vec<RasterEntry> = groups.iter().map(to_entry).collect();
    if json {
        let json_str = serde_json::to_string_pretty(&entries)
            .map_err(|e| CliError::General(format!("JSON serialization failed: {}", e)))?;
        println!("{}", json_str);
    } else {
        for raster in &entries {
            println!("{}x{}", raster.width, raster.height);
            for rate in &raster.rates {
                let names: Vec<&str> = rate.modes.iter().map(|m| m.name).collect();
                println!("  {:>6} fps  {}", rate.fps, names.join(", "));
            }
        }
    }

    Ok(())
}

fn to_entry(group: &FormatGroup) -> RasterEntry {
    RasterEntry {
        width: group.width,
        height: group.height,
        rates: group
            .rates
            .iter()
            .map(|rate| RateEntry {
                fps: rate.frame_rate.to_string(),
                frame_rate: [rate.frame_rate.dividend, rate.frame_rate.divisor],
                modes: rate
                    .formats
                    .iter()
                    .map(|f| ModeEntry {
                        name: f.mode.name(),
                        interlaced: f.interlaced,
                        frame_size: f.frame_size(),
                    })
                    .collect(),
            })
            .collect(),
    }
}
