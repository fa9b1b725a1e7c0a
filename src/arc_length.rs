//! Arc-Length Pass
//!
//! Cumulative path length along a gesture, used by the stamp and airbrush
//! shading to space texture evenly along a stroke instead of per segment.
//!
//! The CPU prefix sum is authoritative. When the adapter supports compute,
//! [`ArcLengthPass`] recomputes the same values on the GPU in one workgroup:
//! every lane scans a contiguous chunk serially, the chunk totals are scanned
//! Hillis-Steele style in workgroup memory, and each lane then adds its
//! exclusive offset. [`blocked_prefix_sum`] is the CPU model of that shader.

use std::ops::Range;

use wgpu::util::DeviceExt;

use crate::segment::{Segment, SegmentInstance};

/// Invocations per workgroup in `shaders/arc_length.wgsl`
pub const WORKGROUP_SIZE: u32 = 128;

/// Inclusive prefix sum of segment lengths, written into `cumulative_length`
pub fn prefix_sum_lengths(segments: &mut [Segment]) {
    let mut running = 0.0;
    for segment in segments.iter_mut() {
        running += segment.length();
        segment.cumulative_length = running;
    }
}

/// Inclusive prefix sum computed the way the compute shader does it
pub fn blocked_prefix_sum(lengths: &[f32], lanes: usize) -> Vec<f32> {
    let lanes = lanes.max(1);
    let chunk = lengths.len().div_ceil(lanes).max(1);

    // Phase 1: each lane scans its own chunk
    let mut output = vec![0.0; lengths.len()];
    let mut totals = vec![0.0f32; lanes];
    for lane in 0..lanes {
        let begin = (lane * chunk).min(lengths.len());
        let end = (begin + chunk).min(lengths.len());
        let mut running = 0.0;
        for i in begin..end {
            running += lengths[i];
            output[i] = running;
        }
        totals[lane] = running;
    }

    // Phase 2: Hillis-Steele inclusive scan over the lane totals
    let mut stride = 1;
    while stride < lanes {
        let previous = totals.clone();
        for lane in stride..lanes {
            totals[lane] = previous[lane] + previous[lane - stride];
        }
        stride *= 2;
    }

    // Phase 3: add the exclusive offset of each lane
    for lane in 1..lanes {
        let begin = (lane * chunk).min(lengths.len());
        let end = (begin + chunk).min(lengths.len());
        for value in &mut output[begin..end] {
            *value += totals[lane - 1];
        }
    }
    output
}

/// Uniforms for the arc-length compute shader
#[repr(C, align(16))]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct ArcLengthParams {
    first: u32,
    count: u32,
    _padding: [u32; 2],
}

/// GPU prefix sum over one gesture of the segment buffer
pub struct ArcLengthPass {
    pipeline: wgpu::ComputePipeline,
    params_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl ArcLengthPass {
    /// Build the pass over the renderer's segment and arc-length buffers
    ///
    /// Both buffers must have been created with `STORAGE` usage.
    pub fn new(device: &wgpu::Device, segment_buffer: &wgpu::Buffer, length_buffer: &wgpu::Buffer) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Arc Length Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/arc_length.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Arc Length Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Arc Length Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Arc Length Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("cs_main"),
            compilation_options: Default::default(),
            cache: None,
        });

        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Arc Length Params Buffer"),
            contents: bytemuck::cast_slice(&[ArcLengthParams {
                first: 0,
                count: 0,
                _padding: [0; 2],
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Arc Length Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: segment_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: length_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        log::info!(
            "✅ Arc length compute pass created (workgroup size {}, {} byte stride)",
            WORKGROUP_SIZE,
            SegmentInstance::STRIDE
        );

        Self {
            pipeline,
            params_buffer,
            bind_group,
        }
    }

    /// Record one dispatch over `gesture`
    ///
    /// The params buffer is shared, so the dispatch is submitted on its own
    /// encoder; queue order keeps it after the pending segment writes and
    /// before the frame's draw.
    pub fn dispatch(&self, device: &wgpu::Device, queue: &wgpu::Queue, gesture: Range<usize>) {
        if gesture.is_empty() {
            return;
        }
        let params = ArcLengthParams {
            first: gesture.start as u32,
            count: gesture.len() as u32,
            _padding: [0; 2],
        };
        queue.write_buffer(&self.params_buffer, 0, bytemuck::cast_slice(&[params]));

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Arc Length Encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Arc Length Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.dispatch_workgroups(1, 1, 1);
        }
        queue.submit(std::iter::once(encoder.finish()));
        log::debug!("Arc length pass dispatched for segments {:?}", gesture);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brush::BrushType;

    fn polyline(points: &[[f32; 2]]) -> Vec<Segment> {
        points
            .windows(2)
            .map(|w| Segment::new(w[0], w[1], [0.0; 4], 0.01, BrushType::Stamp))
            .collect()
    }

    #[test]
    fn test_prefix_sum_lengths() {
        let mut segments = polyline(&[[0.0, 0.0], [0.3, 0.4], [0.3, 0.0], [0.0, 0.0]]);
        prefix_sum_lengths(&mut segments);
        let lengths: Vec<f32> = segments.iter().map(|s| s.cumulative_length).collect();
        assert!((lengths[0] - 0.5).abs() < 1e-6);
        assert!((lengths[1] - 0.9).abs() < 1e-6);
        assert!((lengths[2] - 1.2).abs() < 1e-6);
        let own: Vec<f32> = segments.iter().map(Segment::length).collect();
        for (got, want) in blocked_prefix_sum(&own, 2).iter().zip(&lengths) {
            assert!((got - want).abs() < 1e-6);
        }
    }

    #[test]
    fn test_zero_length_segment_keeps_running_total() {
        let mut segments = polyline(&[[0.0, 0.0], [0.0, 0.0], [0.1, 0.0]]);
        prefix_sum_lengths(&mut segments);
        assert_eq!(segments[0].cumulative_length, 0.0);
        assert!((segments[1].cumulative_length - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_blocked_scan_matches_sequential() {
        for count in [0usize, 1, 5, 127, 128, 129, 1000, 10_000] {
            let lengths: Vec<f32> = (0..count).map(|i| 0.001 + (i % 7) as f32 * 0.002).collect();
            let mut expected = Vec::with_capacity(count);
            let mut running = 0.0f64;
            for length in &lengths {
                running += *length as f64;
                expected.push(running);
            }

            let blocked = blocked_prefix_sum(&lengths, WORKGROUP_SIZE as usize);
            assert_eq!(blocked.len(), count);
            for (got, want) in blocked.iter().zip(&expected) {
                assert!(
                    (*got as f64 - want).abs() <= 1e-3 * want.max(1.0),
                    "count {}: got {} want {}",
                    count,
                    got,
                    want
                );
            }
        }
    }

    #[test]
    fn test_blocked_scan_with_few_lanes() {
        let lengths = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(blocked_prefix_sum(&lengths, 2), vec![1.0, 3.0, 6.0, 10.0, 15.0]);
        assert_eq!(blocked_prefix_sum(&lengths, 1), vec![1.0, 3.0, 6.0, 10.0, 15.0]);
        assert_eq!(blocked_prefix_sum(&lengths, 8), vec![1.0, 3.0, 6.0, 10.0, 15.0]);
    }
}
