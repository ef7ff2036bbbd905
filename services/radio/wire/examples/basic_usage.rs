//! Basic usage example for the radio wire protocol.

use radio_wire::{
    AcceptOutcome, Chunker, DeviceId, FrameCodec, FrameType, Options, Reassembler,
};
use std::time::Instant;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Radio Wire Protocol Example ===\n");

    let sensor = FrameCodec::new(DeviceId::from_mac(&[0x24, 0x6F, 0x28, 0x01, 0x02, 0x03]));
    let gateway = FrameCodec::new(DeviceId([0x10, 0x20, 0x30, 0x40]));

    // 1. Build a telemetry frame
    println!("1. Creating a TELEMETRY frame...");
    let frame = sensor.build(
        FrameType::Telemetry,
        b"t=21.5;h=40",
        gateway.device_id(),
        Options::ACK_REQUESTED,
    )?;
    println!("   Encoded frame size: {} bytes", frame.len());

    // 2. Validate it on the receiving side
    println!("\n2. Validating the frame...");
    let validated = gateway.validate(&frame)?;
    println!("   Checksum valid: {}", validated.checksum_valid);
    println!("   For this device: {}", validated.is_intended_destination);
    println!("   Source: {}", validated.source_id);
    println!("   Type: {:?}", validated.kind());
    println!("   Payload: {:?}", std::str::from_utf8(validated.payload));

    // 3. Split a large payload into chunks
    println!("\n3. Demonstrating chunking...");
    let large_payload = vec![0x42u8; 1000];
    let chunks = Chunker::new(sensor).chunk_frames(
        &large_payload,
        gateway.device_id(),
        Options::empty(),
    )?;
    println!("   Split into {} chunks", chunks.len());

    // 4. Reassemble them
    println!("\n4. Reassembling chunks...");
    let mut reassembler = Reassembler::new();
    let now = Instant::now();
    for chunk in &chunks {
        let validated = gateway.validate(chunk)?;
        if let AcceptOutcome::Complete(done) = reassembler.accept(&validated, -60, 8, now) {
            println!("   Reassembled message size: {} bytes", done.payload.len());
            println!(
                "   Original matches reassembled: {}",
                done.payload == large_payload
            );
        }
    }

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
