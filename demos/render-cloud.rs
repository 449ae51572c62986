//! Renders a few evolving grain clouds into a wav file.

use std::{path::Path, time::Duration};

use grainclouds::{
    outputs::WavOutput, DirectionMode, Engine, EngineConfig, Error, Sample, SampleSet,
    ScatteredPositions, SpatialMode, WindowType,
};

// -------------------------------------------------------------------------------------------------

// Common demo code
#[path = "./common/arguments.rs"]
mod arguments;

// -------------------------------------------------------------------------------------------------

#[cfg(all(debug_assertions, feature = "assert-allocs"))]
#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

// -------------------------------------------------------------------------------------------------

const SAMPLE_RATE: u32 = 44100;
const CHANNEL_COUNT: usize = 2;

const DEFAULT_OUTPUT_PATH: &str = "grainclouds.wav";
const DEFAULT_DURATION_SECS: u64 = 10;

// -------------------------------------------------------------------------------------------------

fn main() -> Result<(), Error> {
    // Parse optional arguments
    let args = arguments::parse();

    // Load or synthesize sample material
    let samples = match &args.input_path {
        Some(path) => load_sample(path)?,
        None => synthesize_chord(),
    };

    // Create the engine
    let mut config = EngineConfig::new()
        .sample_rate(SAMPLE_RATE)
        .channel_count(CHANNEL_COUNT);
    if let Some(seed) = args.seed {
        config = config.seed(seed);
    }
    let (mut engine, mut engine_handle) = Engine::new(config, samples)?;
    let sample_count = engine_handle.samples().len();

    // A dense, slowly detuning pad cloud
    let mut pad = engine_handle.add_cluster(
        16,
        ScatteredPositions::new(vec![0.5; sample_count], 0.3, args.seed),
    )?;
    pad.set_duration_ms(400.0)?;
    pad.set_overlap(0.8)?;
    pad.set_window(WindowType::Hanning)?;
    pad.set_pitch_lfo_freq(0.1)?;
    pad.set_pitch_lfo_amount(0.02)?;
    pad.set_spatial_mode(SpatialMode::AlternatingStereo, None)?;
    pad.set_volume_db(-12.0)?;

    // Sparse, short and high pitched sparkles
    let mut sparkles = engine_handle.add_cluster(
        4,
        ScatteredPositions::new(vec![0.2; sample_count], 0.2, args.seed),
    )?;
    sparkles.set_duration_ms(40.0)?;
    sparkles.set_overlap(0.0)?;
    sparkles.set_pitch(2.0)?;
    sparkles.set_window(WindowType::Random)?;
    sparkles.set_direction(DirectionMode::Random)?;
    sparkles.set_spatial_mode(SpatialMode::AroundRobin, None)?;
    sparkles.set_volume_db(-18.0)?;

    // Render, changing parameters once per second
    let output_path = args
        .output_path
        .unwrap_or_else(|| DEFAULT_OUTPUT_PATH.into());
    let duration_secs = args.duration.unwrap_or(DEFAULT_DURATION_SECS);
    let mut output = WavOutput::open_for(&output_path, &engine)?;
    for second in 0..duration_secs {
        if second == duration_secs / 2 {
            sparkles.add_voice()?;
            sparkles.add_voice()?;
            pad.set_window(WindowType::Triangle)?;
        }
        pad.set_overlap(0.4 + 0.6 * (second as f32 / duration_secs as f32))?;
        sparkles.set_pitch(if second % 2 == 0 { 2.0 } else { 1.5 })?;
        output.write(&mut engine, Duration::from_secs(1))?;
    }
    output.finalize()?;

    log::info!(
        "Rendered {duration_secs} seconds into '{}'",
        output_path.display()
    );
    Ok(())
}

// -------------------------------------------------------------------------------------------------

fn load_sample(path: &Path) -> Result<SampleSet, Error> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let buffer = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 * scale))
                .collect::<Result<Vec<_>, _>>()?
        }
    };
    let name = path
        .file_stem()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let sample = Sample::new(name, spec.channels as usize, spec.sample_rate, buffer)?;
    Ok(vec![sample].into())
}

fn synthesize_chord() -> SampleSet {
    let frequencies = [220.0, 277.18, 329.63];
    let frame_count = SAMPLE_RATE as usize * 4;
    frequencies
        .iter()
        .enumerate()
        .filter_map(|(index, frequency)| {
            let buffer = (0..frame_count)
                .map(|frame| {
                    let phase = frame as f32 * frequency * std::f32::consts::TAU;
                    0.3 * (phase / SAMPLE_RATE as f32).sin()
                })
                .collect();
            Sample::new(format!("tone-{index}"), 1, SAMPLE_RATE, buffer).ok()
        })
        .collect::<Vec<_>>()
        .into()
}
