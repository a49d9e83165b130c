//! Integration tests for Tacotron
//!
//! Tests the full pipeline from sentences to WAV files on a tiny model.

use candle_core::{DType, Device, Tensor};
use std::path::Path;
use tempfile::tempdir;

use tacotron::audio::conversion::ms_to_samples;
use tacotron::audio::{PhaseInit, Reconstructor, Spectrogram, SpectrogramAnalyzer};
use tacotron::config::{CbhgParams, Config, FileNaming};
use tacotron::inference::{read_events, CheckpointStore, Session, Synthesizer, Trainer, EVENTS_FILE};
use tacotron::models::tacotron::{SummaryValue, Targets};
use tacotron::models::{Inputs, Mode};
use tacotron::text::{pad_sentence, PaddedBatch, Vocabulary, PAD_ID};
use tacotron::TacotronError;

fn small_cbhg() -> CbhgParams {
    CbhgParams {
        n_banks: 3,
        n_filters: 4,
        n_proj_filters: 8,
        n_highway_layers: 2,
        n_highway_units: 6,
        n_gru_units: 5,
    }
}

/// 800 Hz, n_fft 16, window 16 samples, hop 4 samples, 4 mels, r = 2
fn small_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.audio.sampling_rate = 800;
    config.audio.n_fft = 16;
    config.audio.win_len_ms = 20.0;
    config.audio.win_hop_ms = 5.0;
    config.audio.n_mels = 4;
    config.audio.reconstruction_iterations = 4;
    config.model.reduction = 2;
    config.model.embedding_size = 8;
    config.model.encoder_prenet = vec![8, 6];
    config.model.encoder = small_cbhg();
    config.model.decoder_prenet = vec![8, 4];
    config.model.attention_units = 6;
    config.model.attention_rnn_units = 6;
    config.model.decoder_rnn_units = 6;
    config.model.n_decoder_rnn_layers = 2;
    config.model.max_decoder_iterations = 5;
    config.model.post = small_cbhg();
    config.model.checkpoint_every = 2;
    config.inference.checkpoint_dir = root.join("checkpoints");
    config.inference.synthesis_dir = root.join("synthesis");
    config
}

fn init_checkpoint(config: &Config) -> std::path::PathBuf {
    let session = Session::new(config, Device::Cpu).unwrap();
    CheckpointStore::new(config.load_run_dir()).save(session.varmap(), 0).unwrap()
}

#[test]
fn test_window_conversion() {
    assert_eq!(ms_to_samples(50.0, 22050), 1102);
    assert_eq!(ms_to_samples(12.5, 22050), 275);

    let config = Config::default();
    assert_eq!(config.win_length(), 1102);
    assert_eq!(config.hop_length(), 275);
    assert_eq!(config.n_freq(), 1025);
}

#[test]
fn test_padding_batch() {
    let vocabulary = Vocabulary::default();
    let (ids, lengths) = vocabulary.process_sentences(&["ab", "hello there", "x"]);
    assert_eq!(lengths, vec![3, 12, 2]);

    let batch = PaddedBatch::new(&ids, vocabulary.pad_id()).unwrap();
    assert_eq!(batch.max_len(), 12);
    assert!(batch.ids.iter().all(|s| s.len() == 12));
    assert_eq!(batch.ids[2][2..], [PAD_ID; 10]);

    assert!(pad_sentence(&ids[1], 5, PAD_ID).is_err());
}

#[test]
fn test_post_process_preserves_time() {
    let dir = tempdir().unwrap();
    let config = small_config(dir.path());
    let session = Session::new(&config, Device::Cpu).unwrap();

    for steps in [1, 4, 9] {
        let mel = Tensor::rand(0.0f32, 1.0, (2, steps, config.mel_width()), &Device::Cpu).unwrap();
        let linear = session.model().post_process(&mel, Mode::Eval).unwrap();
        assert_eq!(linear.dims3().unwrap(), (2, steps, (1 + 16 / 2) * 2));
    }
}

#[test]
fn test_missing_output_dir_fails_before_work() {
    let dir = tempdir().unwrap();
    let config = small_config(dir.path());
    init_checkpoint(&config);

    let result = Synthesizer::new(&config, Device::Cpu, None);
    assert!(matches!(result, Err(TacotronError::MissingOutputDir(_))));
    assert!(!config.save_run_dir().exists());
}

#[test]
fn test_missing_checkpoint() {
    let dir = tempdir().unwrap();
    let config = small_config(dir.path());
    std::fs::create_dir_all(&config.inference.synthesis_dir).unwrap();

    let result = Synthesizer::new(&config, Device::Cpu, None);
    assert!(matches!(result, Err(TacotronError::NoCheckpoint(_))));

    let explicit = dir.path().join("model-7.safetensors");
    let result = Synthesizer::new(&config, Device::Cpu, Some(explicit.as_path()));
    assert!(matches!(result, Err(TacotronError::NoCheckpoint(_))));
}

#[test]
fn test_train_without_target_fails() {
    let dir = tempdir().unwrap();
    let config = small_config(dir.path());
    let session = Session::new(&config, Device::Cpu).unwrap();

    let mel = Tensor::zeros((1, 3, config.mel_width()), DType::F32, &Device::Cpu).unwrap();
    let inputs = Inputs::Spectrogram {
        mel,
        linear: None,
        seq_lengths: vec![3],
    };
    let result = session.model().build(inputs, Mode::Train);
    assert!(matches!(result, Err(TacotronError::MissingTarget("train"))));
}

#[test]
fn test_target_shape_mismatch_fails() {
    let dir = tempdir().unwrap();
    let config = small_config(dir.path());
    let session = Session::new(&config, Device::Cpu).unwrap();

    let mel = Tensor::zeros((1, 3, config.mel_width()), DType::F32, &Device::Cpu).unwrap();
    let linear_dims = (1, 3, config.linear_width() - 1);
    let linear = Tensor::zeros(linear_dims, DType::F32, &Device::Cpu).unwrap();
    let inputs = Inputs::Spectrogram {
        mel,
        linear: Some(linear),
        seq_lengths: vec![3],
    };
    let result = session.model().build(inputs, Mode::Eval);
    assert!(matches!(result, Err(TacotronError::Shape { .. })));
}

#[test]
fn test_end_to_end_synthesis() {
    let dir = tempdir().unwrap();
    let mut config = small_config(dir.path());
    config.inference.file_naming = FileNaming::Index;
    std::fs::create_dir_all(&config.inference.synthesis_dir).unwrap();
    init_checkpoint(&config);

    let mut synthesizer = Synthesizer::new(&config, Device::Cpu, None).unwrap();
    let sentences = ["a short sentence.", "this sentence is a good deal longer"];
    let batch = synthesizer.encode(&sentences).unwrap();

    // Raw spectrograms: max_decoder_iterations * r frames of n_freq bins
    let predictions = synthesizer.predict(&batch).unwrap();
    assert_eq!(predictions.len(), 2);
    for prediction in &predictions {
        assert_eq!(prediction.frames, 10);
        assert_eq!(prediction.linear.bins(), 9);
    }

    // Waveforms: hop * (frames - 1) samples
    let written = synthesizer.synthesize_to_dir(&sentences).unwrap();
    assert_eq!(written.len(), 2);
    assert!(written[0].ends_with("0000.wav"));
    for path in &written {
        let reader = hound::WavReader::open(path).unwrap();
        assert_eq!(reader.spec().sample_rate, 800);
        assert_eq!(reader.len(), 4 * 9);
    }

    // Summaries go to the save run, never the load run
    let events = read_events(config.save_run_dir().join(EVENTS_FILE)).unwrap();
    assert!(events.iter().any(|e| e.tag == "normalized_outputs/linear_spec"));
    assert!(!config.load_run_dir().join(EVENTS_FILE).exists());
}

#[test]
fn test_trainer_step_and_resume() {
    let dir = tempdir().unwrap();
    let config = small_config(dir.path());
    let device = Device::Cpu;

    let vocabulary = Vocabulary::new(&config.dataset.vocabulary);
    let (ids, lengths) = vocabulary.process_sentences(&["we are the borg"]);
    let batch = PaddedBatch::new(&ids, vocabulary.pad_id()).unwrap();

    let make_inputs = || Inputs::Sentences {
        ids: Tensor::from_vec(batch.flat_ids(), (1, batch.max_len()), &device).unwrap(),
        seq_lengths: lengths.clone(),
        targets: Some(Targets {
            mel: Tensor::full(0.5f32, (1, 3, config.mel_width()), &device).unwrap(),
            linear: Tensor::full(0.5f32, (1, 3, config.linear_width()), &device).unwrap(),
        }),
    };

    let mut trainer = Trainer::new(&config, device.clone()).unwrap();
    let first = trainer.step(make_inputs()).unwrap();
    assert!(first.total.is_finite());
    assert!(first.mel.is_some());
    trainer.step(make_inputs()).unwrap();
    assert_eq!(trainer.current_step(), 2);

    // checkpoint_every = 2
    let store = CheckpointStore::new(config.load_run_dir());
    assert_eq!(store.latest().unwrap(), Some(store.path_for(2)));

    let events = read_events(config.load_run_dir().join(EVENTS_FILE)).unwrap();
    let losses: Vec<_> = events.iter().filter(|e| e.tag == "loss").collect();
    assert_eq!(losses.len(), 2);
    assert!(matches!(losses[0].value, SummaryValue::Scalar { .. }));
    assert!(events.iter().any(|e| e.tag == "normalized_inputs/linear_spec"));
    drop(trainer);

    let resumed = Trainer::resume(&config, device.clone()).unwrap();
    assert_eq!(resumed.current_step(), 2);
    let eval = resumed.evaluate(make_inputs()).unwrap();
    assert!(eval.linear.is_finite());
}

#[test]
fn test_reconstruction_length_and_determinism() {
    let dir = tempdir().unwrap();
    let config = small_config(dir.path());
    let reconstructor = Reconstructor::new(&config).unwrap().with_phase_init(PhaseInit::Random(7));

    let rows: Vec<Vec<f32>> = (0..12)
        .map(|t| (0..9).map(|k| ((t + k) % 5) as f32 / 5.0).collect())
        .collect();
    let spec = Spectrogram::from_rows(&rows).unwrap();

    let a = reconstructor.reconstruct(&spec).unwrap();
    let b = reconstructor.reconstruct(&spec).unwrap();
    assert_eq!(a.len(), 4 * 11);
    assert_eq!(a, b);
    assert!(a.iter().all(|s| s.is_finite()));
}

#[test]
fn test_train_from_analyzed_audio() {
    let dir = tempdir().unwrap();
    let config = small_config(dir.path());
    let device = Device::Cpu;
    let analyzer = SpectrogramAnalyzer::new(&config).unwrap();

    let tone = |freq: f32, len: usize| -> Vec<f32> {
        (0..len)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / 800.0).sin())
            .collect()
    };
    let analyzed = vec![
        analyzer.analyze(&tone(100.0, 120)).unwrap(),
        analyzer.analyze(&tone(220.0, 64)).unwrap(),
    ];
    assert_eq!(analyzed[0].linear.frames(), 31);

    let targets = Targets::from_analyzed(&analyzed, config.model.reduction, &device).unwrap();
    assert_eq!(targets.steps().unwrap(), 16);

    let vocabulary = Vocabulary::new(&config.dataset.vocabulary);
    let (ids, lengths) = vocabulary.process_sentences(&["low tone", "high"]);
    let batch = PaddedBatch::new(&ids, vocabulary.pad_id()).unwrap();
    let inputs = Inputs::Sentences {
        ids: Tensor::from_vec(batch.flat_ids(), (2, batch.max_len()), &device).unwrap(),
        seq_lengths: lengths,
        targets: Some(targets),
    };

    let mut trainer = Trainer::new(&config, device).unwrap();
    let loss = trainer.step(inputs).unwrap();
    assert!(loss.total.is_finite());
    assert!(loss.total > 0.0);
}

#[test]
fn test_text_naming_keeps_one_file_per_line() {
    let dir = tempdir().unwrap();
    let mut config = small_config(dir.path());
    config.inference.file_naming = FileNaming::Text;
    config.model.max_decoder_iterations = 2;
    std::fs::create_dir_all(&config.inference.synthesis_dir).unwrap();
    init_checkpoint(&config);

    let mut synthesizer = Synthesizer::new(&config, Device::Cpu, None).unwrap();
    let written = synthesizer.synthesize_to_dir(&["Hello there.", "hello, there!"]).unwrap();
    assert_eq!(written.len(), 2);
    assert_ne!(written[0], written[1]);
    assert!(written.iter().all(|path| path.is_file()));
}
