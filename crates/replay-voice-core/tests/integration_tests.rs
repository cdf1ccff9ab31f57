//! Integration tests for replay-voice-core crate

use replay_voice_core::{
    ActionSet, AudioPayload, BoxAllocator, EngineConfig, EngineError, EngineState, EventId,
    ObjectToken, OutputSite, RegistrationScript, SpeakFlags, StatusCode, SynthesisEvent,
    TextFragment, TtsEngine, WaveFormat, CANONICAL_BITS_PER_SAMPLE, CANONICAL_CHANNELS,
    CANONICAL_SAMPLE_RATE, WAVE_FORMAT_EX_ID, WAV_HEADER_LEN,
};
use std::cell::RefCell;
use std::path::Path;
use tempfile::TempDir;

/// What the site saw, in call order
#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Actions,
    Events(Vec<SynthesisEvent>),
    Write(Vec<u8>),
}

struct RecordingSite {
    calls: RefCell<Vec<Call>>,
    event_status: StatusCode,
    accept_limit: Option<u32>,
}

impl RecordingSite {
    fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            event_status: StatusCode::OK,
            accept_limit: None,
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }
}

impl OutputSite for RecordingSite {
    fn get_actions(&self) -> ActionSet {
        self.calls.borrow_mut().push(Call::Actions);
        ActionSet::CONTINUE
    }

    fn add_events(&self, events: &[SynthesisEvent]) -> StatusCode {
        self.calls.borrow_mut().push(Call::Events(events.to_vec()));
        self.event_status
    }

    fn write(&self, data: &[u8]) -> Result<u32, StatusCode> {
        self.calls.borrow_mut().push(Call::Write(data.to_vec()));
        let len = u32::try_from(data.len()).unwrap();
        Ok(self.accept_limit.map_or(len, |limit| limit.min(len)))
    }
}

fn write_canonical_wav(path: &Path, samples: &[i16]) {
    let spec = hound::WavSpec {
        channels: CANONICAL_CHANNELS,
        sample_rate: CANONICAL_SAMPLE_RATE,
        bits_per_sample: CANONICAL_BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("Should create WAV");
    for &sample in samples {
        writer.write_sample(sample).expect("Should write sample");
    }
    writer.finalize().expect("Should finalize WAV");
}

fn engine_over(dir: &TempDir, samples: &[i16]) -> TtsEngine {
    let path = dir.path().join("hal.wav");
    write_canonical_wav(&path, samples);
    let config = EngineConfig::default().with_payload_path(path);
    TtsEngine::with_config(config).expect("Should create engine")
}

fn utf16(text: &str) -> Vec<u16> {
    text.encode_utf16().collect()
}

#[test]
fn test_three_fragment_utterance() {
    let dir = TempDir::new().unwrap();
    let engine = engine_over(&dir, &[100, -100, 200]);
    let site = RecordingSite::new();

    let (a, b, c) = (utf16("Hello"), utf16("pod bay d."), utf16("Dave..."));
    let third = TextFragment::new(&c, 15);
    let second = TextFragment::new(&b, 5).with_next(&third);
    let first = TextFragment::new(&a, 0).with_next(&second);

    let report = engine
        .speak(
            SpeakFlags::DEFAULT,
            &WAVE_FORMAT_EX_ID,
            Some(&WaveFormat::canonical()),
            Some(&first),
            &site,
        )
        .expect("Speak should succeed");

    assert_eq!(report.text_length, 22);
    assert_eq!(report.bytes_requested, 6);
    assert!(!report.short_write());

    let calls = site.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0], Call::Actions);
    match &calls[1] {
        Call::Events(events) => {
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].event_id, EventId::SentenceBoundary);
            assert_eq!(events[0].w_param, 22);
            assert_eq!(events[0].l_param, 0);
        }
        other => panic!("Expected events, got {other:?}"),
    }
    assert_eq!(calls[2], Call::Write(vec![100, 0, 0x9C, 0xFF, 200, 0]));
}

#[test]
fn test_absent_fragments_still_produce_audio() {
    let dir = TempDir::new().unwrap();
    let engine = engine_over(&dir, &[1, 2]);
    let site = RecordingSite::new();

    let report = engine
        .speak::<TextFragment<'_>, _>(
            SpeakFlags::ASYNC | SpeakFlags::IS_XML,
            &WAVE_FORMAT_EX_ID,
            None,
            None,
            &site,
        )
        .unwrap();

    assert_eq!(report.text_length, 0);
    assert_eq!(
        site.calls().iter().filter(|c| matches!(c, Call::Write(_))).count(),
        1
    );
}

#[test]
fn test_rejected_event_prevents_audio() {
    let dir = TempDir::new().unwrap();
    let engine = engine_over(&dir, &[1, 2, 3]);
    let site = RecordingSite {
        event_status: StatusCode::FAIL,
        ..RecordingSite::new()
    };
    let text = utf16("Hello");
    let fragment = TextFragment::new(&text, 0);

    let err = engine
        .speak(SpeakFlags::DEFAULT, &WAVE_FORMAT_EX_ID, None, Some(&fragment), &site)
        .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::FAIL);
    assert!(!site.calls().iter().any(|c| matches!(c, Call::Write(_))));
}

#[test]
fn test_short_write_is_tolerated_and_counted() {
    let dir = TempDir::new().unwrap();
    let engine = engine_over(&dir, &[1, 2, 3, 4]);
    let site = RecordingSite {
        accept_limit: Some(3),
        ..RecordingSite::new()
    };

    let report = engine
        .speak::<TextFragment<'_>, _>(SpeakFlags::DEFAULT, &WAVE_FORMAT_EX_ID, None, None, &site)
        .expect("Short write should not fail by default");

    assert!(report.short_write());
    assert_eq!(report.bytes_written, 3);
    let stats = engine.stats();
    assert_eq!(stats.short_writes, 1);
    assert_eq!(stats.bytes_written, 3);
    assert_eq!(stats.payload_len, 8);
}

#[test]
fn test_object_token_lifecycle() {
    let dir = TempDir::new().unwrap();
    let engine = engine_over(&dir, &[]);

    assert_eq!(engine.state(), EngineState::Ready);
    assert!(matches!(engine.object_token(), Err(EngineError::MissingToken)));
    assert_eq!(
        engine.object_token().unwrap_err().status_code(),
        StatusCode::UNINITIALIZED
    );

    engine.set_object_token(ObjectToken::from_raw(0x1000));
    engine.set_object_token(ObjectToken::from_raw(0x2000));
    assert_eq!(engine.state(), EngineState::TokenBound);
    assert_eq!(engine.object_token().unwrap().as_raw(), 0x2000);
}

#[test]
fn test_output_format_ignores_request() {
    let dir = TempDir::new().unwrap();
    let engine = engine_over(&dir, &[]);

    let unrequested = engine.get_output_format(None, None, &BoxAllocator).unwrap();
    let stereo = WaveFormat::pcm(2, 44_100, 16).unwrap();
    let requested = engine
        .get_output_format(Some(&WAVE_FORMAT_EX_ID), Some(&stereo), &BoxAllocator)
        .unwrap();

    for negotiated in [&unrequested, &requested] {
        assert_eq!(negotiated.format_id, WAVE_FORMAT_EX_ID);
        assert_eq!(*negotiated.format, WaveFormat::canonical());
        assert!(negotiated.format.is_consistent());
    }
    assert!(!std::ptr::eq(&*unrequested.format, &*requested.format));
}

#[test]
fn test_canonical_format_serialization_is_stable() {
    let canonical = WaveFormat::canonical();

    let json = serde_json::to_string(&canonical).unwrap();
    let once: WaveFormat = serde_json::from_str(&json).unwrap();
    let twice: WaveFormat = serde_json::from_str(&serde_json::to_string(&once).unwrap()).unwrap();
    assert_eq!(once.to_le_bytes(), canonical.to_le_bytes());
    assert_eq!(twice.to_le_bytes(), canonical.to_le_bytes());

    let decoded = WaveFormat::from_le_bytes(&canonical.to_le_bytes()).unwrap();
    assert_eq!(decoded, canonical);
}

#[test]
fn test_payload_matches_file_minus_header() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hal.wav");
    write_canonical_wav(&path, &[5, 6, 7]);

    let file_len = std::fs::metadata(&path).unwrap().len();
    let payload = AudioPayload::load(&path).unwrap();
    assert_eq!(payload.len() as u64, file_len - WAV_HEADER_LEN as u64);
}

#[test]
fn test_missing_payload_aborts_construction() {
    let dir = TempDir::new().unwrap();
    let config = EngineConfig::default().with_payload_path(dir.path().join("absent.wav"));
    assert!(matches!(
        TtsEngine::with_config(config),
        Err(EngineError::PayloadLoad { .. })
    ));
}

#[test]
fn test_config_file_drives_engine() {
    let dir = TempDir::new().unwrap();
    write_canonical_wav(&dir.path().join("voice.wav"), &[9, 9]);
    let config_path = dir.path().join("engine.toml");
    std::fs::write(
        &config_path,
        "payload_path = \"voice.wav\"\nfail_on_short_write = true\nlog_fragments = false\n",
    )
    .unwrap();

    let engine = TtsEngine::with_config(EngineConfig::load(&config_path).unwrap()).unwrap();
    let site = RecordingSite {
        accept_limit: Some(0),
        ..RecordingSite::new()
    };
    let err = engine
        .speak::<TextFragment<'_>, _>(SpeakFlags::DEFAULT, &WAVE_FORMAT_EX_ID, None, None, &site)
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::ShortWrite {
            requested: 4,
            written: 0
        }
    ));
}

#[test]
fn test_registration_script_round_trip() {
    let dir = TempDir::new().unwrap();
    let manifest = r#"
        [server]
        clsid = "4dffd59b-4df3-4366-b053-dff9be002efb"
        description = "Replay Voice Text-To-Speech Engine"
        prog_id = "ReplayVoice.TTSEngine.1"
        version_independent_prog_id = "ReplayVoice.TTSEngine"
        server_path = "C:\\Voices\\replay_voice_sapi.dll"
        threading_model = "Both"

        [voice]
        id = "HalVoice"
        display_name = "HAL"
    "#;

    let script = RegistrationScript::from_toml_str(manifest).unwrap();
    let out = dir.path().join("hal.reg");
    script.write_to(&out).unwrap();

    let text = std::fs::read_to_string(out).unwrap();
    assert!(text.contains(r"Speech\Voices\Tokens\HalVoice]"));
    assert!(text.contains(r"WOW6432Node\Microsoft\Speech\Voices\Tokens\HalVoice]"));
    assert!(text.contains("{4DFFD59B-4DF3-4366-B053-DFF9BE002EFB}"));
    assert!(text.contains(r#"@="C:\\Voices\\replay_voice_sapi.dll""#));
}

#[test]
fn test_constants() {
    assert_eq!(CANONICAL_SAMPLE_RATE, 16_000);
    assert_eq!(CANONICAL_CHANNELS, 1);
    assert_eq!(CANONICAL_BITS_PER_SAMPLE, 16);
    assert_eq!(WAV_HEADER_LEN, 44);
    assert_eq!(
        WAVE_FORMAT_EX_ID.to_string(),
        "c31adbae-527f-4ff5-a230-f62bb61ff70c"
    );
    assert!(!replay_voice_core::VERSION.is_empty());
}
