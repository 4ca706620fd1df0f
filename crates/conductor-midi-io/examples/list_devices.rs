use conductor_midi_io::{MidiInputPort, MidiOutputSink};

fn main() {
    tracing_subscriber::fmt::init();

    println!("=== MIDI Input Devices ===");
    let inputs = MidiInputPort::list_devices();
    if inputs.is_empty() {
        println!("  (none found)");
    }
    for dev in &inputs {
        println!("  [{}] {}", dev.index, dev.name);
    }

    println!("\n=== MIDI Output Devices ===");
    let outputs = MidiOutputSink::list_devices();
    if outputs.is_empty() {
        println!("  (none found)");
    }
    for dev in &outputs {
        println!("  [{}] {}", dev.index, dev.name);
    }
}
