use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use grainclouds::{
    DirectionMode, Engine, EngineConfig, Error, FixedPositions, Sample, SampleSet,
    ScatteredPositions, SpatialMode, WindowType,
};

// -------------------------------------------------------------------------------------------------

fn noise_samples(sample_rate: u32) -> Result<SampleSet, Error> {
    let mono = (0..sample_rate as usize)
        .map(|i| ((i * 7919) % 200) as f32 / 100.0 - 1.0)
        .collect();
    let left = (0..sample_rate as usize / 2)
        .map(|i| ((i * 104729) % 200) as f32 / 100.0 - 1.0)
        .collect::<Vec<_>>();
    let right = left.iter().rev().copied().collect::<Vec<_>>();
    Ok(vec![
        Sample::new("mono", 1, sample_rate, mono)?,
        Sample::from_planar("stereo", sample_rate, &[left, right])?,
    ]
    .into())
}

// -------------------------------------------------------------------------------------------------

#[test]
fn control_thread_drives_clusters() -> Result<(), Error> {
    let config = EngineConfig::new()
        .sample_rate(22050)
        .channel_count(4)
        .max_voices(16)
        .seed(1234);
    let samples = noise_samples(config.sample_rate)?;
    let (mut engine, mut engine_handle) = Engine::new(config, samples)?;

    let cluster =
        engine_handle.add_cluster(8, ScatteredPositions::new(vec![0.5, 0.5], 0.5, Some(1)))?;
    let other = engine_handle.add_cluster(1, FixedPositions::uniform(2, 0.0))?;

    let running = Arc::new(AtomicBool::new(true));
    let control_thread = thread::spawn({
        let running = Arc::clone(&running);
        let mut cluster = cluster;
        move || {
            let mut step = 0_usize;
            while running.load(Ordering::Relaxed) {
                // full queues are fine: the render thread catches up
                let _ = cluster.set_duration_ms(5.0 + (step % 50) as f32);
                let _ = cluster.set_overlap((step % 10) as f32 / 10.0);
                let _ = cluster.set_pitch(0.5 + (step % 4) as f32 * 0.5);
                let _ = cluster.set_pitch_lfo_freq(2.0);
                let _ = cluster.set_pitch_lfo_amount(0.1);
                let _ = cluster.set_window(WindowType::Hanning.cycled(step as isize));
                let _ = cluster.set_direction(DirectionMode::Forward.cycled(step as isize));
                let _ =
                    cluster.set_spatial_mode(SpatialMode::Unity.cycled(step as isize), None);
                let _ = cluster.set_volume_db(-((step % 30) as f32));
                if step % 3 == 0 {
                    let _ = cluster.add_voice();
                } else if step % 5 == 0 {
                    let _ = cluster.remove_voice();
                }
                if step % 7 == 0 {
                    cluster.toggle_active();
                }
                step += 1;
                thread::sleep(Duration::from_micros(100));
            }
            cluster.set_active(true);
            cluster
        }
    });

    let mut output = vec![0.0; 4 * 256];
    let mut peak = 0.0_f32;
    for _ in 0..400 {
        engine.render(&mut output);
        assert!(output.iter().all(|v| v.is_finite() && (-1.0..=1.0).contains(v)));
        peak = peak.max(output.iter().fold(0.0, |acc, v| acc.max(v.abs())));
        thread::sleep(Duration::from_micros(50));
    }
    running.store(false, Ordering::Relaxed);
    let cluster = control_thread.join().expect("control thread panicked");

    assert!(peak > 0.0);
    assert!((1..=16).contains(&cluster.voice_count()));
    assert!(cluster.is_active());

    engine_handle.remove_cluster(other.id())?;
    engine_handle.remove_cluster(cluster.id())?;
    engine.render(&mut output);
    assert_eq!(engine.cluster_count(), 0);
    assert!(output.iter().all(|v| *v == 0.0));
    engine_handle.collect_garbage();
    Ok(())
}

#[test]
fn engine_moves_to_render_thread() -> Result<(), Error> {
    let config = EngineConfig::new().sample_rate(8000).seed(5);
    let samples = noise_samples(config.sample_rate)?;
    let (mut engine, mut engine_handle) = Engine::new(config, samples)?;
    let mut cluster = engine_handle.add_cluster(4, FixedPositions::uniform(2, 0.25))?;
    cluster.set_duration_ms(20.0)?;

    let render_thread = thread::spawn(move || {
        let mut output = vec![0.0; 2 * 128];
        let mut non_silent_buffers = 0;
        for _ in 0..100 {
            engine.render(&mut output);
            if output.iter().any(|v| *v != 0.0) {
                non_silent_buffers += 1;
            }
        }
        (engine, non_silent_buffers)
    });
    let (engine, non_silent_buffers) = render_thread.join().expect("render thread panicked");
    assert!(non_silent_buffers > 0);
    assert_eq!(engine.pos_in_frames(), 100 * 128);
    Ok(())
}
