// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Card enumeration with per-input signal status.

use crate::error::CliError;
use crate::utils::open_registry;
use clap::Args as ClapArgs;
use serde::Serialize;
use videoio::{ChannelId, Device, DeviceRegistry};

#[derive(ClapArgs, Debug)]
pub struct Args {
    /// Show only the card with this serial number
    #[arg(short, long)]
    serial: Option<String>,

    /// List every input, including those without a usable signal
    #[arg(long)]
    all: bool,
}

#[derive(Debug, Serialize)]
struct DevicesOutput {
    devices: Vec<DeviceEntry>,
    summary: Summary,
}

#[derive(Debug, Serialize)]
struct DeviceEntry {
    serial: String,
    id: i32,
    card: String,
    inputs: Vec<InputEntry>,
}

#[derive(Debug, Serialize)]
struct InputEntry {
    channel: String,
    accepts_signal: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<String>,
}

#[derive(Debug, Serialize)]
struct Summary {
    cards: usize,
    inputs_with_signal: usize,
}

pub fn execute(args: Args, json: bool, simulate: bool) -> Result<(), CliError> {
    log::debug!("Executing devices command: {:?}", args);

    let registry = open_registry(simulate)?;
    let output = collect(&registry, &args)?;

    if json {
        let json_str = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::General(format!("JSON serialization failed: {}", e)))?;
        println!("{}", json_str);
    } else {
        print_text_output(&output);
    }

    Ok(())
}

fn collect(registry: &DeviceRegistry, args: &Args) -> Result<DevicesOutput, CliError> {
    let devices: Vec<&Device> = match &args.serial {
        Some(serial) => vec![registry.device(serial)?],
        None => registry.iter().collect(),
    };

    let entries: Vec<DeviceEntry> = devices
        .into_iter()
        .map(|device| DeviceEntry {
            serial: device.serial().to_string(),
            id: device.id(),
            card: device.name().to_string(),
            inputs: inputs_of(device, args.all),
        })
        .collect();

    let inputs_with_signal = entries
        .iter()
        .flat_map(|d| &d.inputs)
        .filter(|i| i.accepts_signal)
        .count();

    Ok(DevicesOutput {
        summary: Summary {
            cards: entries.len(),
            inputs_with_signal,
        },
        devices: entries,
    })
}

fn inputs_of(device: &Device, all: bool) -> Vec<InputEntry> {
    ChannelId::inputs()
        .filter_map(|channel| {
            let negotiated = device.negotiate_input_setup(channel);
            if let Err(err) = &negotiated {
                log::debug!("{} {}: {}", device, channel, err);
            }
            let mode = negotiated.ok().map(|format| format.mode.name().to_string());
            if mode.is_none() && !all {
                return None;
            }
            Some(InputEntry {
                channel: channel.name(),
                accepts_signal: mode.is_some(),
                mode,
            })
        })
        .collect()
}

fn print_text_output(output: &DevicesOutput) {
    if output.devices.is_empty() {
        println!("No cards found");
        return;
    }

    for device in &output.devices {
        println!("{} (SN {}, id {})", device.card, device.serial, device.id);
        if device.inputs.is_empty() {
            println!("  no input signal");
        }
        for input in &device.inputs {
            match &input.mode {
                Some(mode) => println!("  {:<12} {}", input.channel, mode),
                None => println!("  {:<12} -", input.channel),
            }
        }
    }

    println!(
        "\n{} card(s), {} input(s) with signal",
        output.summary.cards, output.summary.inputs_with_signal
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_simulated() {
        let registry = open_registry(true).unwrap();
        let args = Args {
            serial: None,
            all: false,
        };
        let output = collect(&registry, &args).unwrap();

        assert_eq!(output.summary.cards, 2);
        let first = &output.devices[0];
        assert_eq!(first.serial, "SIM-0001");
        assert_eq!(first.inputs.len(), 2);
        assert_eq!(first.inputs[0].channel, "Input Ch 1");
        assert_eq!(first.inputs[0].mode.as_deref(), Some("1080i59.94"));

        // recommendation only, still usable
        assert_eq!(output.devices[1].inputs[0].mode.as_deref(), Some("1080p25"));
        assert_eq!(output.summary.inputs_with_signal, 3);
    }

    #[test]
    fn test_collect_all_inputs() {
        let registry = open_registry(true).unwrap();
        let args = Args {
            serial: Some("SIM-0002".into()),
            all: true,
        };
        let output = collect(&registry, &args).unwrap();
        assert_eq!(output.devices.len(), 1);
        assert_eq!(output.devices[0].inputs.len(), 8);
        assert_eq!(
            output.devices[0]
                .inputs
                .iter()
                .filter(|i| i.accepts_signal)
                .count(),
            1
        );
    }

    #[test]
    fn test_unknown_serial() {
        let registry = open_registry(true).unwrap();
        let args = Args {
            serial: Some("nope".into()),
            all: false,
        };
        assert!(matches!(
            collect(&registry, &args),
            Err(CliError::DeviceNotFound(_))
        ));
    }
}
