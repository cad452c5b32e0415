use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use haunted_mirror_core::archive::domain::snapshot_archive::SnapshotArchive;
use haunted_mirror_core::archive::infrastructure::image_file_writer::ImageFileWriter;
use haunted_mirror_core::capture::domain::frame_source::{CaptureError, FrameSource};
use haunted_mirror_core::detection::domain::presence_detector::PresenceDetector;
use haunted_mirror_core::display::domain::display_surface::{DisplayError, DisplaySurface};
use haunted_mirror_core::lighting::domain::lighting_controller::{
    LightingCommand, LightingController,
};
use haunted_mirror_core::mirror::mirror_config::MirrorConfig;
use haunted_mirror_core::mirror::mirror_loop::MirrorLoop;
use haunted_mirror_core::mirror::session_logger::LogSessionLogger;
use haunted_mirror_core::shared::frame::Frame;
use haunted_mirror_core::shared::region::{DetectionResult, Region};
use haunted_mirror_core::transform::infrastructure::img2img_client::Img2ImgClient;

struct GradientCamera {
    index: usize,
}

impl FrameSource for GradientCamera {
    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        let (w, h) = (32u32, 24u32);
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for y in 0..h {
            for x in 0..w {
                data.extend_from_slice(&[(x * 8) as u8, (y * 10) as u8, 128]);
            }
        }
        self.index += 1;
        Ok(Frame::new(data, w, h, 3, self.index))
    }

    fn drain(&mut self, _duration: Duration) -> Result<usize, CaptureError> {
        Ok(0)
    }

    fn close(&mut self) {}
}

/// Sees a face in the first frame only.
struct FirstFrameVisitor {
    calls: usize,
}

impl PresenceDetector for FirstFrameVisitor {
    fn detect(&mut self, _frame: &Frame) -> DetectionResult {
        self.calls += 1;
        if self.calls == 1 {
            vec![Region::new(4, 4, 16, 16)]
        } else {
            vec![]
        }
    }
}

struct HeadlessSurface {
    presented: Arc<Mutex<Vec<(u32, u32)>>>,
    quit_after: Option<usize>,
}

impl DisplaySurface for HeadlessSurface {
    fn present(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        self.presented
            .lock()
            .unwrap()
            .push((frame.width(), frame.height()));
        Ok(())
    }

    fn blank(&mut self) -> Result<(), DisplayError> {
        self.present(&Frame::black(1, 1))
    }

    fn quit_requested(&mut self) -> bool {
        self.quit_after
            .is_some_and(|n| self.presented.lock().unwrap().len() >= n)
    }

    fn close(&mut self) {}
}

struct RecordingLighting(Arc<Mutex<Vec<LightingCommand>>>);

impl LightingController for RecordingLighting {
    fn send(&mut self, command: LightingCommand) {
        self.0.lock().unwrap().push(command);
    }
}

/// Answers one img2img request with a 16x16 PNG and hands back the request JSON.
fn fake_backend() -> (String, thread::JoinHandle<serde_json::Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream);
        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        assert!(request_line.starts_with("POST /sdapi/v1/img2img"));

        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            if line == "\r\n" || line.is_empty() {
                break;
            }
            if let Some(v) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                content_length = v.trim().parse().unwrap();
            }
        }
        let mut body = vec![0u8; content_length];
        reader.read_exact(&mut body).unwrap();

        let image = Frame::black(16, 16).to_png().unwrap();
        let response = format!(r#"{{"images": ["{}"]}}"#, STANDARD.encode(image));
        let mut stream = reader.into_inner();
        write!(
            stream,
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{response}",
            response.len()
        )
        .unwrap();
        serde_json::from_slice(&body).unwrap()
    });
    (url, handle)
}

#[test]
fn test_visitor_gets_transformed_and_snapshots_are_saved() {
    let (url, backend) = fake_backend();
    let shots = tempfile::tempdir().unwrap();

    let mut config = MirrorConfig::default();
    config.backend_url = url;
    config.output_dir = Some(shots.path().join("session"));
    config.validate().unwrap();

    let preview_frames = Arc::new(Mutex::new(Vec::new()));
    let output_frames = Arc::new(Mutex::new(Vec::new()));
    let lighting = Arc::new(Mutex::new(Vec::new()));
    let holds = Arc::new(Mutex::new(Vec::new()));
    let holds_seen = holds.clone();

    let transformer = Img2ImgClient::new(
        &config.backend_url,
        config.generation.clone(),
        config.timeout(),
    )
    .unwrap();
    let archive = SnapshotArchive::new(
        shots.path().join("session"),
        Box::new(ImageFileWriter::new()),
    );

    let mut mirror = MirrorLoop::new(
        &config,
        Box::new(GradientCamera { index: 0 }),
        Box::new(FirstFrameVisitor { calls: 0 }),
        Box::new(transformer),
        Box::new(HeadlessSurface {
            presented: preview_frames.clone(),
            quit_after: Some(3),
        }),
        Box::new(HeadlessSurface {
            presented: output_frames.clone(),
            quit_after: None,
        }),
    )
    .with_lighting(Box::new(RecordingLighting(lighting.clone())))
    .with_archive(archive)
    .with_logger(Box::new(LogSessionLogger::default()))
    .with_sleeper(Box::new(move |d| holds_seen.lock().unwrap().push(d)));

    let report = mirror.run().unwrap();

    assert_eq!(report.frames_watched, 3);
    assert_eq!(report.episodes, 1);
    assert_eq!(report.successes, 1);
    assert_eq!(report.failed_transforms, 0);
    assert_eq!(report.persistence_failures, 0);

    let request = backend.join().unwrap();
    assert_eq!(request["prompt"], "spooky scary skeletons");
    assert_eq!(request["resize_mode"], 2);
    let sent = STANDARD
        .decode(request["init_images"][0].as_str().unwrap())
        .unwrap();
    let sent = Frame::from_encoded(&sent, 0).unwrap();
    assert_eq!((sent.width(), sent.height()), (32, 24));
    // Mirrored: the brightest red column is now on the left
    assert_eq!(sent.data()[0], 31 * 8);

    assert_eq!(*output_frames.lock().unwrap(), vec![(16, 16), (1, 1)]);
    assert_eq!(*holds.lock().unwrap(), vec![Duration::from_secs(2)]);
    assert_eq!(
        *lighting.lock().unwrap(),
        vec![
            LightingCommand::Flicker,
            LightingCommand::Dark,
            LightingCommand::Lit
        ]
    );

    let mut saved: Vec<String> = std::fs::read_dir(shots.path().join("session"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    saved.sort();
    assert_eq!(saved.len(), 2);
    assert!(saved[0].ends_with("_orig.png"));
    assert!(saved[1].ends_with("_spooky.png"));
    assert_eq!(
        saved[0].trim_end_matches("_orig.png"),
        saved[1].trim_end_matches("_spooky.png")
    );
}

#[test]
fn test_unreachable_backend_keeps_the_mirror_watching() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = MirrorConfig {
        backend_url: format!("http://127.0.0.1:{port}"),
        ..MirrorConfig::default()
    };
    let transformer = Img2ImgClient::new(
        &config.backend_url,
        config.generation.clone(),
        Duration::from_secs(2),
    )
    .unwrap();
    let output_frames = Arc::new(Mutex::new(Vec::new()));

    let mut mirror = MirrorLoop::new(
        &config,
        Box::new(GradientCamera { index: 0 }),
        Box::new(FirstFrameVisitor { calls: 0 }),
        Box::new(transformer),
        Box::new(HeadlessSurface {
            presented: Arc::new(Mutex::new(Vec::new())),
            quit_after: Some(4),
        }),
        Box::new(HeadlessSurface {
            presented: output_frames.clone(),
            quit_after: None,
        }),
    )
    .with_sleeper(Box::new(|_| {}));

    let report = mirror.run().unwrap();
    assert_eq!(report.failed_transforms, 1);
    assert_eq!(report.frames_watched, 4);
    assert!(output_frames.lock().unwrap().is_empty());
}
