//! Container output tests
//!
//! Push frames through the pipelines the factory builds and check the
//! bytes that land on disk.

use trial_recorder::application::ports::PipelineFactory;
use trial_recorder::application::Pipeline;
use trial_recorder::domain::recording::{
    AudioFormat, Channels, Codec, Container, OutputTarget, RawFrame,
};
use trial_recorder::infrastructure::recording::{wav_header, WAV_HEADER_SIZE};
use trial_recorder::infrastructure::ContainerFactory;

fn pipeline_for(path: &std::path::Path, format: AudioFormat) -> Pipeline {
    let target = OutputTarget::new(path, format);
    ContainerFactory::new().build(&target).unwrap()
}

fn sine(samples: usize, rate: u32, channels: usize) -> Vec<i16> {
    (0..samples)
        .flat_map(|i| {
            let t = i as f32 / rate as f32;
            let value = (f32::sin(2.0 * std::f32::consts::PI * 440.0 * t) * 12000.0) as i16;
            std::iter::repeat(value).take(channels)
        })
        .collect()
}

#[test]
fn wav_header_layout() {
    let format = AudioFormat::new(Channels::Stereo, 44100, Codec::Wav).unwrap();
    let header = wav_header(&format, 4000);

    assert_eq!(header.len(), WAV_HEADER_SIZE);
    assert_eq!(&header[0..4], b"RIFF");
    assert_eq!(u32::from_le_bytes([header[4], header[5], header[6], header[7]]), 4036);
    assert_eq!(&header[8..16], b"WAVEfmt ");
    assert_eq!(u16::from_le_bytes([header[20], header[21]]), 1);
    assert_eq!(u16::from_le_bytes([header[22], header[23]]), 2);
    assert_eq!(
        u32::from_le_bytes([header[24], header[25], header[26], header[27]]),
        44100
    );
    assert_eq!(
        u32::from_le_bytes([header[28], header[29], header[30], header[31]]),
        176400
    );
    assert_eq!(u16::from_le_bytes([header[34], header[35]]), 16);
    assert_eq!(&header[36..40], b"data");
    assert_eq!(
        u32::from_le_bytes([header[40], header[41], header[42], header[43]]),
        4000
    );
}

#[test]
fn wav_pipeline_decodes_with_hound() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    let format = AudioFormat::new(Channels::Mono, 22050, Codec::Wav).unwrap();
    let samples = sine(22050, 22050, 1);

    let mut pipeline = pipeline_for(&path, format);
    assert_eq!(pipeline.container(), Container::Wav);
    pipeline.open().unwrap();
    for chunk in samples.chunks(1024) {
        pipeline.push(RawFrame::from_samples(chunk)).unwrap();
    }
    let size = pipeline.finalize().unwrap();
    assert_eq!(size, 44 + 22050 * 2);

    let mut reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().sample_rate, 22050);
    let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(decoded, samples);
}

#[test]
fn wav_pipeline_overwrites_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reuse.wav");
    std::fs::write(&path, vec![0xAA; 10_000]).unwrap();

    let format = AudioFormat::new(Channels::Mono, 11025, Codec::Wav).unwrap();
    let mut pipeline = pipeline_for(&path, format);
    pipeline.open().unwrap();
    pipeline.push(RawFrame::from_samples(&[1, 2, 3, 4])).unwrap();
    pipeline.finalize().unwrap();

    assert_eq!(std::fs::metadata(&path).unwrap().len(), 44 + 8);
}

#[test]
fn flac_pipeline_decodes_to_captured_samples() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.flac");
    let format = AudioFormat::new(Channels::Mono, 44100, Codec::Flac).unwrap();
    // Not a whole number of 4096-sample blocks
    let samples = sine(44100, 44100, 1);

    let mut pipeline = pipeline_for(&path, format);
    assert_eq!(pipeline.container(), Container::Flac);
    pipeline.open().unwrap();
    for chunk in samples.chunks(1024) {
        pipeline.push(RawFrame::from_samples(chunk)).unwrap();
    }
    let size = pipeline.finalize().unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes.len() as u64, size);
    assert_eq!(&bytes[0..4], b"fLaC");
    // Lossless but still smaller than the PCM payload
    assert!(bytes.len() < samples.len() * 2);

    let mut reader = claxon::FlacReader::open(&path).unwrap();
    let info = reader.streaminfo();
    assert_eq!(info.sample_rate, 44100);
    assert_eq!(info.channels, 1);
    assert_eq!(info.samples, Some(44100));
    assert!(info.min_frame_size.is_some());
    let decoded: Vec<i16> = reader.samples().map(|s| s.unwrap() as i16).collect();
    assert_eq!(decoded, samples);
}

#[test]
fn flac_stereo_pipeline_is_lossless() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stereo.flac");
    let format = AudioFormat::new(Channels::Stereo, 22050, Codec::Flac).unwrap();
    let samples = sine(22050, 22050, 2);

    let mut pipeline = pipeline_for(&path, format);
    pipeline.open().unwrap();
    for chunk in samples.chunks(2048) {
        pipeline.push(RawFrame::from_samples(chunk)).unwrap();
    }
    pipeline.finalize().unwrap();

    let mut reader = claxon::FlacReader::open(&path).unwrap();
    assert_eq!(reader.streaminfo().samples, Some(22050));
    let decoded: Vec<i16> = reader.samples().map(|s| s.unwrap() as i16).collect();
    assert_eq!(decoded, samples);
}

#[test]
fn empty_flac_recording_is_header_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.flac");
    let format = AudioFormat::new(Channels::Stereo, 22050, Codec::Flac).unwrap();

    let mut pipeline = pipeline_for(&path, format);
    pipeline.open().unwrap();
    let size = pipeline.finalize().unwrap();

    assert_eq!(size, 42);
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[0..4], b"fLaC");
}

#[cfg(not(feature = "opus"))]
#[test]
fn opus_needs_the_feature() {
    let format = AudioFormat::new(Channels::Mono, 44100, Codec::Opus).unwrap();
    let target = OutputTarget::new("take.opus", format);
    let err = ContainerFactory::new().build(&target).unwrap_err();
    assert!(err.to_string().contains("opus"));
}

#[cfg(feature = "opus")]
mod opus {
    use super::*;

    /// (header type, granule position, payload) per page
    fn ogg_pages(bytes: &[u8]) -> Vec<(u8, u64, Vec<u8>)> {
        let mut pages = Vec::new();
        let mut offset = 0;
        while offset + 27 <= bytes.len() {
            assert_eq!(&bytes[offset..offset + 4], b"OggS");
            let header_type = bytes[offset + 5];
            let mut granule = [0u8; 8];
            granule.copy_from_slice(&bytes[offset + 6..offset + 14]);
            let segments = bytes[offset + 26] as usize;
            let table = &bytes[offset + 27..offset + 27 + segments];
            let body_len: usize = table.iter().map(|&s| s as usize).sum();
            let body_start = offset + 27 + segments;
            pages.push((
                header_type,
                u64::from_le_bytes(granule),
                bytes[body_start..body_start + body_len].to_vec(),
            ));
            offset = body_start + body_len;
        }
        pages
    }

    #[test]
    fn opus_pipeline_writes_complete_ogg_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.opus");
        let format = AudioFormat::new(Channels::Mono, 44100, Codec::Opus).unwrap();
        let samples = sine(44100, 44100, 1);

        let mut pipeline = pipeline_for(&path, format);
        assert_eq!(pipeline.container(), Container::Ogg);
        pipeline.open().unwrap();
        for chunk in samples.chunks(1024) {
            pipeline.push(RawFrame::from_samples(chunk)).unwrap();
        }
        pipeline.finalize().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let pages = ogg_pages(&bytes);
        assert!(pages.len() >= 3);

        let (first_type, _, head) = &pages[0];
        assert_eq!(first_type & 0x02, 0x02, "first page starts the stream");
        assert!(head.starts_with(b"OpusHead"));
        let pre_skip = u64::from(u16::from_le_bytes([head[10], head[11]]));
        assert!(pre_skip > 0, "encoder delay is declared");
        assert!(pages[1].2.starts_with(b"OpusTags"));

        let (last_type, granule, _) = pages.last().unwrap();
        assert_eq!(last_type & 0x04, 0x04, "last page ends the stream");
        assert_eq!(*granule, pre_skip + 48000);
    }
}
