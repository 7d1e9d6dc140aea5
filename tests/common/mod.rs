//! Common test utilities and helpers for the flyer layer tests
//!
//! Provides a scripted in-memory transform gateway and small image builders so
//! session behavior can be tested without a network.

#![allow(dead_code)]

/// Image builders for uploads and expected outputs
pub mod images {
    use std::io::Cursor;

    use flyer_layers::{Artifact, MediaType};
    use image::{Rgba, RgbaImage};

    /// Solid-color PNG bytes.
    pub fn png(w: u32, h: u32, color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(w, h, Rgba(color));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png)
            .expect("encode test png");
        out.into_inner()
    }

    pub fn png_artifact(w: u32, h: u32, color: [u8; 4]) -> Artifact {
        Artifact::new(MediaType::Png, png(w, h, color))
    }

    /// A valid PNG padded with trailing bytes up to `total_len`.
    ///
    /// Decoders stop after IEND, so the header and pixels still read back
    /// normally.
    pub fn padded_png(w: u32, h: u32, color: [u8; 4], total_len: usize) -> Vec<u8> {
        let mut data = png(w, h, color);
        assert!(data.len() <= total_len);
        data.resize(total_len, 0);
        data
    }

    /// Bytes that start like a JPEG, `len` long.
    pub fn jpeg_like(len: usize) -> Vec<u8> {
        let mut data = vec![0u8; len];
        data[..3].copy_from_slice(&[0xFF, 0xD8, 0xFF]);
        data
    }

    /// Resampled pixels may be off by one per channel.
    pub fn assert_close(actual: [u8; 4], expected: [u8; 4]) {
        let near = actual.iter().zip(expected).all(|(a, e)| a.abs_diff(e) <= 1);
        assert!(near, "{actual:?} is not close to {expected:?}");
    }

    pub fn pixel(artifact: &Artifact, x: u32, y: u32) -> [u8; 4] {
        artifact
            .decode()
            .expect("decodable artifact")
            .to_rgba8()
            .get_pixel(x, y)
            .0
    }
}

/// Scripted transform gateway
pub mod fake_gateway {
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use flyer_layers::config::{EnhancementSettings, OutputFormat, ResolutionTier};
    use flyer_layers::processing::codec;
    use flyer_layers::{Artifact, FlyerError, FlyerResult, LayerKind, MediaType, TransformGateway};
    use tokio::sync::{Barrier, Semaphore};

    use super::images;

    /// One recorded gateway call.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Extract(LayerKind),
        Enhance(LayerKind),
        Restore,
        SuperResolve(ResolutionTier, OutputFormat),
        Generate(String),
    }

    /// In-memory gateway whose outputs are derived from its inputs.
    ///
    /// - Extraction returns a 2x2 PNG whose color encodes the layer kind and
    ///   the input length, so results for different sources are distinct.
    /// - Operations can be scripted to fail by key (`"extract:person"`,
    ///   `"enhance"`, `"restore"`, `"super_resolve"`, `"generate"`).
    /// - Operations can be held by key (`"extract"`, `"restore"`,
    ///   `"generate"`) until released; extraction can also wait on a barrier.
    pub struct FakeGateway {
        calls: Mutex<Vec<Call>>,
        failures: Mutex<HashSet<String>>,
        holds: Mutex<HashMap<String, Arc<Semaphore>>>,
        barrier: Option<Arc<Barrier>>,
        export_media: Mutex<MediaType>,
        generation: Mutex<Option<Artifact>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeGateway {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::build(None))
        }

        /// Every extraction waits until `parties` extractions are in flight.
        pub fn with_extraction_barrier(parties: usize) -> Arc<Self> {
            Arc::new(Self::build(Some(Arc::new(Barrier::new(parties)))))
        }

        fn build(barrier: Option<Arc<Barrier>>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                failures: Mutex::new(HashSet::new()),
                holds: Mutex::new(HashMap::new()),
                barrier,
                export_media: Mutex::new(MediaType::Png),
                generation: Mutex::new(None),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        pub fn fail(&self, key: &str) {
            self.failures.lock().unwrap().insert(key.to_string());
        }

        pub fn fail_extract(&self, kind: LayerKind) {
            self.fail(&format!("extract:{kind}"));
        }

        pub fn succeed(&self, key: &str) {
            self.failures.lock().unwrap().remove(key);
        }

        pub fn succeed_all(&self) {
            self.failures.lock().unwrap().clear();
        }

        /// Hold every extraction until [`open_gate`](Self::open_gate).
        pub fn close_gate(&self) {
            self.hold("extract");
        }

        pub fn open_gate(&self) {
            self.release("extract");
        }

        /// Hold calls of operation `key` until [`release`](Self::release).
        pub fn hold(&self, key: &str) {
            self.holds
                .lock()
                .unwrap()
                .insert(key.to_string(), Arc::new(Semaphore::new(0)));
        }

        pub fn release(&self, key: &str) {
            if let Some(gate) = self.holds.lock().unwrap().remove(key) {
                gate.add_permits(Semaphore::MAX_PERMITS / 2);
            }
        }

        /// Answer text generation with `artifact` instead of the default.
        pub fn set_generation(&self, artifact: Artifact) {
            *self.generation.lock().unwrap() = Some(artifact);
        }

        /// Media type super-resolution answers with.
        pub fn set_export_media(&self, media: MediaType) {
            *self.export_media.lock().unwrap() = media;
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub fn extract_calls(&self, kind: LayerKind) -> usize {
            self.calls()
                .iter()
                .filter(|c| **c == Call::Extract(kind))
                .count()
        }

        pub fn total_extract_calls(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| matches!(c, Call::Extract(_)))
                .count()
        }

        pub fn max_concurrent_extractions(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }

        /// Wait (bounded) until at least `n` extraction calls were recorded.
        pub async fn wait_for_extract_calls(&self, n: usize) {
            self.wait_until(|calls| {
                calls.iter().filter(|c| matches!(c, Call::Extract(_))).count() >= n
            })
            .await;
        }

        /// Wait (bounded) until `call` was recorded.
        pub async fn wait_for_call(&self, call: Call) {
            self.wait_until(|calls| calls.contains(&call)).await;
        }

        async fn wait_until(&self, done: impl Fn(&[Call]) -> bool) {
            tokio::time::timeout(Duration::from_secs(5), async {
                while !done(self.calls().as_slice()) {
                    tokio::time::sleep(Duration::from_millis(2)).await;
                }
            })
            .await
            .expect("gateway calls were not dispatched in time");
        }

        pub fn extraction_output(input: &Artifact, kind: LayerKind) -> Artifact {
            let len = input.len();
            images::png_artifact(
                2,
                2,
                [kind_tag(kind), (len & 0xff) as u8, ((len >> 8) & 0xff) as u8, 255],
            )
        }

        pub fn enhancement_output(kind: LayerKind) -> Artifact {
            images::png_artifact(2, 2, [kind_tag(kind) + 1, 200, 200, 255])
        }

        pub fn restoration_output() -> Artifact {
            images::png_artifact(4, 3, [7, 7, 7, 255])
        }

        pub fn generation_output() -> Artifact {
            images::png_artifact(5, 4, [50, 60, 70, 255])
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        async fn pass(&self, key: &str) {
            let gate = self.holds.lock().unwrap().get(key).cloned();
            if let Some(gate) = gate {
                let _permit = gate.acquire().await.expect("hold semaphore closed");
            }
        }

        fn check(&self, key: &str) -> FlyerResult<()> {
            if self.failures.lock().unwrap().contains(key) {
                return Err(FlyerError::gateway(key, "scripted failure"));
            }
            Ok(())
        }
    }

    fn kind_tag(kind: LayerKind) -> u8 {
        match kind {
            LayerKind::Background => 10,
            LayerKind::Person => 20,
            LayerKind::Text => 30,
        }
    }

    #[async_trait]
    impl TransformGateway for FakeGateway {
        async fn extract(&self, image: &Artifact, kind: LayerKind) -> FlyerResult<Artifact> {
            self.record(Call::Extract(kind));
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(barrier) = &self.barrier {
                barrier.wait().await;
            }
            self.pass("extract").await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.check(&format!("extract:{kind}"))?;
            Ok(Self::extraction_output(image, kind))
        }

        async fn enhance(
            &self,
            _image: &Artifact,
            kind: LayerKind,
            _settings: &EnhancementSettings,
        ) -> FlyerResult<Artifact> {
            self.record(Call::Enhance(kind));
            self.check("enhance")?;
            Ok(Self::enhancement_output(kind))
        }

        async fn restore(&self, _image: &Artifact) -> FlyerResult<Artifact> {
            self.record(Call::Restore);
            self.pass("restore").await;
            self.check("restore")?;
            Ok(Self::restoration_output())
        }

        async fn super_resolve(
            &self,
            image: &Artifact,
            tier: ResolutionTier,
            format: OutputFormat,
        ) -> FlyerResult<Artifact> {
            self.record(Call::SuperResolve(tier, format));
            self.check("super_resolve")?;
            let media = *self.export_media.lock().unwrap();
            codec::transcode(image, media)
        }

        async fn generate_from_text(&self, prompt: &str) -> FlyerResult<Artifact> {
            self.record(Call::Generate(prompt.to_string()));
            self.pass("generate").await;
            self.check("generate")?;
            let scripted = self.generation.lock().unwrap().clone();
            Ok(scripted.unwrap_or_else(Self::generation_output))
        }
    }
}
