use std::sync::Arc;
use std::task::Poll;
use std::thread;
use std::time::{Duration, Instant};

use glam::{vec3, vec4, Vec3, Vec4};
use rand::Rng;

use crate::gpu::Ray;

/// Triangle spanning `(0, 0)`, `(1, 0)` and `(0, 1)` on the `z = 2` plane.
pub fn unit_triangle() -> Vec<Vec4> {
    vec![
        vec4(0.0, 0.0, 2.0, 0.0),
        vec4(1.0, 0.0, 2.0, 0.0),
        vec4(0.0, 1.0, 2.0, 0.0),
    ]
}

/// Two disjoint triangles on the `z = 0` plane, one on each side of the
/// origin.
pub fn two_triangles() -> Vec<Vec4> {
    vec![
        vec4(-3.0, -1.0, 0.0, 0.0),
        vec4(-1.0, -1.0, 0.0, 0.0),
        vec4(-2.0, 1.0, 0.0, 0.0),
        vec4(1.0, -1.0, 0.0, 0.0),
        vec4(3.0, -1.0, 0.0, 0.0),
        vec4(2.0, 1.0, 0.0, 0.0),
    ]
}

/// Small triangles scattered over the `[-10, 10]` cube.
pub fn random_soup(rng: &mut impl Rng, triangle_count: usize) -> Vec<Vec4> {
    let mut vertices = Vec::with_capacity(triangle_count * 3);

    for _ in 0..triangle_count {
        let center = random_point(rng, 10.0);

        for _ in 0..3 {
            vertices.push((center + random_point(rng, 1.0)).extend(0.0));
        }
    }

    vertices
}

/// Half of the triangles are exact copies of each other, lying on the `z = 0`
/// plane; the rest is packed into a few tight clusters below that plane.
pub fn clustered_soup(
    rng: &mut impl Rng,
    triangle_count: usize,
) -> Vec<Vec4> {
    let mut vertices = Vec::with_capacity(triangle_count * 3);
    let coincident = triangle_count / 2;

    for _ in 0..coincident {
        vertices.extend([
            vec4(0.0, 0.0, 0.0, 0.0),
            vec4(1.0, 0.0, 0.0, 0.0),
            vec4(0.0, 1.0, 0.0, 0.0),
        ]);
    }

    let clusters: Vec<_> = (0..4)
        .map(|_| random_point(rng, 10.0) - vec3(0.0, 0.0, 15.0))
        .collect();

    for i in coincident..triangle_count {
        let center = clusters[i % clusters.len()];

        for _ in 0..3 {
            vertices.push((center + random_point(rng, 0.01)).extend(0.0));
        }
    }

    vertices
}

/// Ray starting somewhere around the `[-10, 10]` cube, aimed inside it.
pub fn random_ray(rng: &mut impl Rng) -> Ray {
    let origin = random_point(rng, 30.0);
    let target = random_point(rng, 10.0);

    Ray::new(origin, target - origin)
}

fn random_point(rng: &mut impl Rng, extent: f32) -> Vec3 {
    vec3(
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
    )
}

/// Returns a device to run GPU tests on, or `None` (after printing why) when
/// this machine doesn't have one.
pub fn device() -> Option<(Arc<wgpu::Device>, Arc<wgpu::Queue>)> {
    let instance = wgpu::Instance::default();

    let Some(adapter) = futures_lite::future::block_on(
        instance.request_adapter(&wgpu::RequestAdapterOptions::default()),
    ) else {
        eprintln!("Skipping GPU test: no adapter available");
        return None;
    };

    let (device, queue) = match futures_lite::future::block_on(
        adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("cwbvh_test_device"),
                features: wgpu::Features::empty(),
                limits: wgpu::Limits::downlevel_defaults(),
            },
            None,
        ),
    ) {
        Ok(device) => device,
        Err(err) => {
            eprintln!("Skipping GPU test: request_device failed: {err}");
            return None;
        }
    };

    Some((Arc::new(device), Arc::new(queue)))
}

/// Polls given readback until it completes.
pub fn wait_for<T>(mut poll: impl FnMut() -> Poll<T>) -> T {
    let deadline = Instant::now() + Duration::from_secs(30);

    loop {
        if let Poll::Ready(value) = poll() {
            return value;
        }

        assert!(Instant::now() < deadline, "readback didn't complete in time");

        thread::sleep(Duration::from_millis(1));
    }
}
