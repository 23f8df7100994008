use super::LineVertex;

const RED: [f32; 4] = [0.9, 0.2, 0.2, 1.0];
const GREEN: [f32; 4] = [0.2, 0.85, 0.3, 1.0];
const BLUE: [f32; 4] = [0.25, 0.45, 1.0, 1.0];

/// World axis lines from the origin: X red, Y green, Z blue. Line-list order.
pub fn axis_lines(length: f32) -> [LineVertex; 6] {
    let length = if length.is_finite() && length > 0.0 {
        length
    } else {
        1.0
    };
    let origin = [0.0, 0.0, 0.0];
    let line = |end: [f32; 3], color: [f32; 4]| {
        [
            LineVertex {
                position: origin,
                color,
            },
            LineVertex {
                position: end,
                color,
            },
        ]
    };
    let [x0, x1] = line([length, 0.0, 0.0], RED);
    let [y0, y1] = line([0.0, length, 0.0], GREEN);
    let [z0, z1] = line([0.0, 0.0, length], BLUE);
    [x0, x1, y0, y1, z0, z1]
}
