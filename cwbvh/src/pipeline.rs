use std::mem;
use std::sync::Arc;
use std::task::Poll;
use std::thread::{self, JoinHandle};

use glam::Vec4;

use crate::{BvhHandle, BvhRegistry, CwbvhExport, Error, Result};

/// Non-blocking source of the vertices a BVH gets built from (e.g. a GPU
/// buffer being copied back to the host).
pub trait VertexReadback {
    /// Checks whether the transfer has completed; must never block.
    ///
    /// The returned vertices are owned by the caller, so they stay valid no
    /// matter what happens to the source afterwards.
    fn poll(&mut self) -> Poll<Result<Vec<Vec4>>>;
}

/// Destination of finished CWBVHs (e.g. GPU storage buffers).
pub trait CwbvhUpload {
    fn upload(&mut self, cwbvh: &CwbvhExport);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    ReadbackPending,
    Building,
    Ready,
    Failed,
}

/// Drives a BVH from vertices living somewhere else (usually on the GPU) up to
/// an uploaded CWBVH, without ever blocking the thread that calls
/// [`Self::tick()`].
///
/// While a rebuild is in flight, the previously uploaded BVH stays ready; it
/// gets destroyed only once its replacement has been uploaded.
pub struct ConstructionPipeline<R, U> {
    registry: Arc<BvhRegistry>,
    upload: U,
    state: PipelineState,
    readback: Option<(R, usize)>,
    build: Option<JoinHandle<Result<BvhHandle>>>,
    ready: Option<BvhHandle>,
    error: Option<Error>,
}

impl<R, U> ConstructionPipeline<R, U>
where
    R: VertexReadback,
    U: CwbvhUpload,
{
    pub fn new(registry: Arc<BvhRegistry>, upload: U) -> Self {
        Self {
            registry,
            upload,
            state: PipelineState::Idle,
            readback: None,
            build: None,
            ready: None,
            error: None,
        }
    }

    /// Starts building a BVH out of `triangle_count` triangles delivered by
    /// given readback.
    pub fn start(&mut self, readback: R, triangle_count: usize) -> Result<()> {
        if self.is_busy() {
            return Err(Error::PipelineBusy);
        }

        if triangle_count == 0 {
            return Err(Error::EmptyInput);
        }

        log::debug!("Starting BVH construction; triangles = {triangle_count}");

        self.readback = Some((readback, triangle_count));
        self.error = None;
        self.state = PipelineState::ReadbackPending;

        Ok(())
    }

    /// Advances the pipeline as far as it can get without blocking and
    /// returns its new state.
    pub fn tick(&mut self) -> PipelineState {
        match self.state {
            PipelineState::ReadbackPending => self.tick_readback(),
            PipelineState::Building => self.tick_build(),
            _ => (),
        }

        self.state
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Returns whether there's a BVH the renderer can trace against; when
    /// there isn't, it should fall back to not tracing anything.
    pub fn is_ready(&self) -> bool {
        self.ready.is_some()
    }

    pub fn ready_handle(&self) -> Option<BvhHandle> {
        self.ready
    }

    /// Returns why the latest construction failed.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn registry(&self) -> &Arc<BvhRegistry> {
        &self.registry
    }

    pub fn upload(&self) -> &U {
        &self.upload
    }

    fn is_busy(&self) -> bool {
        matches!(
            self.state,
            PipelineState::ReadbackPending | PipelineState::Building
        )
    }

    fn tick_readback(&mut self) {
        let Some((readback, triangle_count)) = &mut self.readback else {
            return;
        };

        let triangle_count = *triangle_count;

        let vertices = match readback.poll() {
            Poll::Pending => return,
            Poll::Ready(result) => result,
        };

        self.readback = None;

        match vertices {
            Ok(vertices) => {
                log::debug!(
                    "Vertices read back; vertices = {}, spawning build",
                    vertices.len()
                );

                let registry = Arc::clone(&self.registry);

                self.build = Some(thread::spawn(move || {
                    registry.build(&vertices, triangle_count, true)
                }));

                self.state = PipelineState::Building;
            }

            Err(err) => self.fail(err),
        }
    }

    fn tick_build(&mut self) {
        if !self.build.as_ref().is_some_and(JoinHandle::is_finished) {
            return;
        }

        let Some(build) = self.build.take() else {
            return;
        };

        let handle = match build.join() {
            Ok(Ok(handle)) => handle,
            Ok(Err(err)) => return self.fail(err),
            Err(_) => return self.fail(Error::BuildPanicked),
        };

        let Some(cwbvh) = self.registry.cwbvh(handle) else {
            // Handle got destroyed by someone else in the meantime
            return self.fail(Error::HandleLost {
                handle: handle.get(),
            });
        };

        self.upload.upload(&cwbvh);

        log::debug!(
            "BVH uploaded; handle = {}, nodes = {}, tris = {}",
            handle.get(),
            cwbvh.nodes_size_bytes(),
            cwbvh.tris_size_bytes(),
        );

        if let Some(prev) = mem::replace(&mut self.ready, Some(handle)) {
            self.registry.destroy(prev);
        }

        self.state = PipelineState::Ready;
    }

    fn fail(&mut self, err: Error) {
        log::warn!("BVH construction failed: {err}");

        self.error = Some(err);
        self.state = PipelineState::Failed;
    }
}

impl<R, U> Drop for ConstructionPipeline<R, U> {
    fn drop(&mut self) {
        // Threads can't be cancelled, so wait for the build to finish and
        // throw away whatever it produced
        if let Some(build) = self.build.take() {
            if let Ok(Ok(handle)) = build.join() {
                self.registry.destroy(handle);
            }
        }

        if let Some(handle) = self.ready.take() {
            self.registry.destroy(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::test_utils;

    struct FakeReadback {
        pending_polls: usize,
        result: Option<Result<Vec<Vec4>>>,
    }

    impl FakeReadback {
        fn ok(pending_polls: usize, vertices: Vec<Vec4>) -> Self {
            Self {
                pending_polls,
                result: Some(Ok(vertices)),
            }
        }

        fn err(pending_polls: usize) -> Self {
            Self {
                pending_polls,
                result: Some(Err(Error::Transfer("device lost".into()))),
            }
        }
    }

    impl VertexReadback for FakeReadback {
        fn poll(&mut self) -> Poll<Result<Vec<Vec4>>> {
            if self.pending_polls > 0 {
                self.pending_polls -= 1;
                return Poll::Pending;
            }

            match self.result.take() {
                Some(result) => Poll::Ready(result),
                None => Poll::Pending,
            }
        }
    }

    #[derive(Default)]
    struct FakeUpload {
        uploads: Vec<(usize, usize)>,
    }

    impl CwbvhUpload for FakeUpload {
        fn upload(&mut self, cwbvh: &CwbvhExport) {
            self.uploads
                .push((cwbvh.nodes_size_bytes(), cwbvh.tris_size_bytes()));
        }
    }

    type Target = ConstructionPipeline<FakeReadback, FakeUpload>;

    fn target() -> Target {
        ConstructionPipeline::new(
            Arc::new(BvhRegistry::new()),
            FakeUpload::default(),
        )
    }

    fn tick_until_settled(target: &mut Target) -> PipelineState {
        let deadline = Instant::now() + Duration::from_secs(30);

        loop {
            let state = target.tick();

            if !target.is_busy() || Instant::now() > deadline {
                return state;
            }

            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn builds_and_uploads() {
        let mut target = target();

        assert_eq!(PipelineState::Idle, target.state());
        assert!(!target.is_ready());

        target
            .start(FakeReadback::ok(3, test_utils::two_triangles()), 2)
            .unwrap();

        // Readback is still in flight
        assert_eq!(PipelineState::ReadbackPending, target.tick());
        assert!(!target.is_ready());

        assert_eq!(PipelineState::Ready, tick_until_settled(&mut target));
        assert!(target.is_ready());
        assert_eq!(1, target.upload().uploads.len());
        assert_eq!(2 * 48, target.upload().uploads[0].1);

        let handle = target.ready_handle().unwrap();

        assert!(target.registry().is_ready(handle));
    }

    #[test]
    fn rejects_concurrent_starts() {
        let mut target = target();

        target
            .start(FakeReadback::ok(100, test_utils::unit_triangle()), 1)
            .unwrap();

        let actual =
            target.start(FakeReadback::ok(0, test_utils::unit_triangle()), 1);

        assert!(matches!(actual, Err(Error::PipelineBusy)));
    }

    #[test]
    fn rejects_empty_input() {
        let mut target = target();
        let actual = target.start(FakeReadback::ok(0, Vec::new()), 0);

        assert!(matches!(actual, Err(Error::EmptyInput)));
        assert_eq!(PipelineState::Idle, target.state());
    }

    #[test]
    fn transfer_error() {
        let mut target = target();

        target.start(FakeReadback::err(2), 1).unwrap();

        assert_eq!(PipelineState::Failed, tick_until_settled(&mut target));
        assert!(matches!(target.error(), Some(Error::Transfer(_))));
        assert!(!target.is_ready());
        assert!(target.registry().is_empty());
        assert!(target.upload().uploads.is_empty());
    }

    #[test]
    fn handle_destroyed_before_upload() {
        let mut target = target();

        target
            .start(FakeReadback::ok(0, test_utils::two_triangles()), 2)
            .unwrap();

        assert_eq!(PipelineState::Building, target.tick());

        let deadline = Instant::now() + Duration::from_secs(30);

        while target.registry().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }

        // Fresh registry, so the build lands in the first slot
        assert!(target.registry().destroy(BvhHandle::new(0)));

        assert_eq!(PipelineState::Failed, tick_until_settled(&mut target));
        assert!(matches!(
            target.error(),
            Some(Error::HandleLost { handle: 0 })
        ));
        assert!(!target.is_ready());
        assert!(target.upload().uploads.is_empty());
    }

    #[test]
    fn build_error() {
        let mut target = target();

        // Readback delivered fewer vertices than promised
        target
            .start(FakeReadback::ok(0, test_utils::unit_triangle()), 5)
            .unwrap();

        assert_eq!(PipelineState::Failed, tick_until_settled(&mut target));

        assert!(matches!(
            target.error(),
            Some(Error::NotEnoughVertices { .. })
        ));
    }

    #[test]
    fn rebuild_keeps_previous_bvh_until_replaced() {
        let mut target = target();

        target
            .start(FakeReadback::ok(0, test_utils::unit_triangle()), 1)
            .unwrap();

        tick_until_settled(&mut target);

        let first = target.ready_handle().unwrap();

        // Failed rebuild leaves the previous BVH alone
        target.start(FakeReadback::err(0), 1).unwrap();

        assert_eq!(PipelineState::Failed, tick_until_settled(&mut target));
        assert_eq!(Some(first), target.ready_handle());
        assert!(target.registry().is_ready(first));

        // Successful rebuild replaces it
        target
            .start(FakeReadback::ok(1, test_utils::two_triangles()), 2)
            .unwrap();

        assert_eq!(PipelineState::ReadbackPending, target.tick());
        assert_eq!(Some(first), target.ready_handle());
        assert_eq!(PipelineState::Ready, tick_until_settled(&mut target));

        let second = target.ready_handle().unwrap();

        assert_eq!(1, target.registry().len());
        assert!(target.registry().is_ready(second));
        assert_eq!(2, target.upload().uploads.len());
    }

    #[test]
    fn drop_joins_in_flight_build() {
        let registry = Arc::new(BvhRegistry::new());

        let mut target: Target = ConstructionPipeline::new(
            Arc::clone(&registry),
            FakeUpload::default(),
        );

        let mut rng = StdRng::seed_from_u64(3);
        let vertices = test_utils::random_soup(&mut rng, 5000);

        target.start(FakeReadback::ok(0, vertices), 5000).unwrap();
        target.tick();

        drop(target);

        assert!(registry.is_empty());
    }
}
