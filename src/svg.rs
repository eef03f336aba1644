use crate::canvas::Canvas;
use crate::types::{Color, Pt};

// Vector logo support. The subset covers what logo exports usually contain:
// - <path d="..."> with M/L/H/V/C/S/Q/T/A/Z (absolute and relative)
// - <rect>, <circle>, <ellipse>, <line>, <polyline>, <polygon>
// - fill, stroke, stroke-width, stroke-linecap, stroke-linejoin, fill-rule as
//   attributes or in style=""
// - transform="" on elements and groups: translate, scale, rotate, matrix
// Everything else (text, gradients, clip paths, <style> sheets) is skipped.

#[derive(Debug, Clone, Copy)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    fn identity() -> Self {
        Self::scale(1.0, 1.0)
    }

    fn translate(tx: f32, ty: f32) -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: tx,
            f: ty,
        }
    }

    fn scale(sx: f32, sy: f32) -> Self {
        Self {
            a: sx,
            b: 0.0,
            c: 0.0,
            d: sy,
            e: 0.0,
            f: 0.0,
        }
    }

    fn rotate(deg: f32) -> Self {
        let rad = deg.to_radians();
        let s = libm::sinf(rad);
        let c = libm::cosf(rad);
        Self {
            a: c,
            b: s,
            c: -s,
            d: c,
            e: 0.0,
            f: 0.0,
        }
    }

    fn mul(self, other: Self) -> Self {
        Self {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    fn apply(self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    // sqrt(|det|); used to scale stroke widths.
    fn scale_factor(self) -> f32 {
        let det = self.a * self.d - self.b * self.c;
        libm::sqrtf(det.abs())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PathSeg {
    MoveTo(f32, f32),
    LineTo(f32, f32),
    CurveTo(f32, f32, f32, f32, f32, f32),
    Close,
}

#[derive(Debug, Clone)]
struct LogoStyle {
    fill: Option<Color>,
    stroke: Option<Color>,
    stroke_width: f32,
    line_cap: u8,
    line_join: u8,
    evenodd: bool,
}

impl Default for LogoStyle {
    // SVG defaults: black fill, no stroke.
    fn default() -> Self {
        Self {
            fill: Some(Color::BLACK),
            stroke: None,
            stroke_width: 1.0,
            line_cap: 0,
            line_join: 0,
            evenodd: false,
        }
    }
}

#[derive(Debug, Clone)]
struct LogoPath {
    segs: Vec<PathSeg>,
    style: LogoStyle,
}

#[derive(Debug, Clone)]
pub(crate) struct LogoArt {
    width: f32,
    height: f32,
    paths: Vec<LogoPath>,
}

impl LogoArt {
    // Returns `None` for markup that is not SVG, has no usable size, or draws
    // nothing.
    pub(crate) fn parse(svg_xml: &str) -> Option<Self> {
        let doc = roxmltree::Document::parse(svg_xml).ok()?;
        let root = doc
            .descendants()
            .find(|n| n.is_element() && n.tag_name().name().eq_ignore_ascii_case("svg"))?;

        let view_box = parse_viewbox(root.attribute("viewBox"));
        let (width, height) = intrinsic_size(
            root.attribute("width").and_then(parse_number),
            root.attribute("height").and_then(parse_number),
            view_box,
        )?;
        let viewport = viewbox_to_viewport_matrix(view_box, width, height);

        let mut paths = Vec::new();
        compile_element(&mut paths, root, viewport, &LogoStyle::default());
        if paths.is_empty() {
            return None;
        }
        Some(Self {
            width,
            height,
            paths,
        })
    }

    pub(crate) fn fit(&self, max_width: Pt, max_height: Pt) -> (Pt, Pt, f32) {
        let sx = max_width.to_f32() / self.width;
        let sy = max_height.to_f32() / self.height;
        let s = sx.min(sy).max(0.0);
        (
            Pt::from_f32(self.width * s),
            Pt::from_f32(self.height * s),
            s,
        )
    }

    pub(crate) fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, s: f32) {
        let place = Matrix::translate(x.to_f32(), y.to_f32()).mul(Matrix::scale(s, s));
        canvas.save_state();
        for path in &self.paths {
            draw_path(canvas, path, place);
        }
        canvas.restore_state();
    }
}

fn intrinsic_size(
    width: Option<f32>,
    height: Option<f32>,
    view_box: Option<(f32, f32, f32, f32)>,
) -> Option<(f32, f32)> {
    let (w, h) = match (width, height, view_box) {
        (Some(w), Some(h), _) => (w, h),
        (Some(w), None, Some((_, _, vw, vh))) => (w, w * vh / vw),
        (None, Some(h), Some((_, _, vw, vh))) => (h * vw / vh, h),
        (None, None, Some((_, _, vw, vh))) => (vw, vh),
        _ => return None,
    };
    if w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0 {
        Some((w, h))
    } else {
        None
    }
}

fn compile_element(
    out: &mut Vec<LogoPath>,
    node: roxmltree::Node<'_, '_>,
    ctm: Matrix,
    style: &LogoStyle,
) {
    if !node.is_element() {
        return;
    }

    let mut local_style = style.clone();
    apply_presentation_attributes(node, &mut local_style);
    if let Some(inline) = node.attribute("style") {
        apply_style_string(inline, &mut local_style);
    }

    let mut local_ctm = ctm;
    if let Some(transform) = node.attribute("transform") {
        local_ctm = local_ctm.mul(parse_transform(transform));
    }

    let segs = match node.tag_name().name() {
        "g" | "svg" | "a" => {
            for child in node.children().filter(|n| n.is_element()) {
                compile_element(out, child, local_ctm, &local_style);
            }
            return;
        }
        "path" => node.attribute("d").map(parse_path_data),
        "rect" => rect_to_path(node),
        "circle" => circle_to_path(node),
        "ellipse" => ellipse_to_path(node),
        "line" => line_to_path(node),
        "polyline" => poly_points_to_path(node, false),
        "polygon" => poly_points_to_path(node, true),
        _ => None,
    };
    if let Some(segs) = segs {
        push_path(out, &segs, &local_style, local_ctm);
    }
}

fn push_path(out: &mut Vec<LogoPath>, segs: &[PathSeg], style: &LogoStyle, ctm: Matrix) {
    let has_fill = style.fill.is_some();
    let has_stroke = style.stroke.is_some() && style.stroke_width > 0.0;
    if segs.is_empty() || (!has_fill && !has_stroke) {
        return;
    }
    let mut out_style = style.clone();
    out_style.stroke_width *= ctm.scale_factor();
    out.push(LogoPath {
        segs: transform_path_segs(segs, ctm),
        style: out_style,
    });
}

fn transform_path_segs(segs: &[PathSeg], ctm: Matrix) -> Vec<PathSeg> {
    segs.iter()
        .map(|seg| match *seg {
            PathSeg::MoveTo(x, y) => {
                let (x, y) = ctm.apply(x, y);
                PathSeg::MoveTo(x, y)
            }
            PathSeg::LineTo(x, y) => {
                let (x, y) = ctm.apply(x, y);
                PathSeg::LineTo(x, y)
            }
            PathSeg::CurveTo(x1, y1, x2, y2, x, y) => {
                let (x1, y1) = ctm.apply(x1, y1);
                let (x2, y2) = ctm.apply(x2, y2);
                let (x, y) = ctm.apply(x, y);
                PathSeg::CurveTo(x1, y1, x2, y2, x, y)
            }
            PathSeg::Close => PathSeg::Close,
        })
        .collect()
}

fn draw_path(canvas: &mut Canvas, path: &LogoPath, place: Matrix) {
    let has_fill = path.style.fill.is_some();
    let has_stroke = path.style.stroke.is_some() && path.style.stroke_width > 0.0;

    if let Some(fill) = path.style.fill {
        canvas.set_fill_color(fill);
    }
    if let Some(stroke) = path.style.stroke {
        canvas.set_stroke_color(stroke);
        canvas.set_line_width(Pt::from_f32(
            path.style.stroke_width * place.scale_factor(),
        ));
        canvas.set_line_cap(path.style.line_cap);
        canvas.set_line_join(path.style.line_join);
    }

    for seg in transform_path_segs(&path.segs, place) {
        match seg {
            PathSeg::MoveTo(x, y) => canvas.move_to(Pt::from_f32(x), Pt::from_f32(y)),
            PathSeg::LineTo(x, y) => canvas.line_to(Pt::from_f32(x), Pt::from_f32(y)),
            PathSeg::CurveTo(x1, y1, x2, y2, x, y) => canvas.curve_to(
                Pt::from_f32(x1),
                Pt::from_f32(y1),
                Pt::from_f32(x2),
                Pt::from_f32(y2),
                Pt::from_f32(x),
                Pt::from_f32(y),
            ),
            PathSeg::Close => canvas.close_path(),
        }
    }

    match (has_fill, has_stroke) {
        (true, true) => canvas.fill_stroke(),
        (true, false) if path.style.evenodd => canvas.fill_evenodd(),
        (true, false) => canvas.fill(),
        (false, true) => canvas.stroke(),
        (false, false) => canvas.end_path(),
    }
}

fn apply_presentation_attributes(node: roxmltree::Node<'_, '_>, style: &mut LogoStyle) {
    for key in [
        "fill",
        "stroke",
        "stroke-width",
        "stroke-linecap",
        "stroke-linejoin",
        "fill-rule",
    ] {
        if let Some(value) = node.attribute(key) {
            apply_property(key, value, style);
        }
    }
}

fn apply_style_string(input: &str, style: &mut LogoStyle) {
    for decl in input.split(';') {
        if let Some((k, v)) = decl.split_once(':') {
            apply_property(&k.trim().to_ascii_lowercase(), v.trim(), style);
        }
    }
}

fn apply_property(key: &str, value: &str, style: &mut LogoStyle) {
    match key {
        "fill" => apply_paint(value, &mut style.fill),
        "stroke" => apply_paint(value, &mut style.stroke),
        "stroke-width" => {
            if let Some(v) = parse_number(value) {
                style.stroke_width = v.max(0.0);
            }
        }
        "stroke-linecap" => {
            style.line_cap = match value {
                "round" => 1,
                "square" => 2,
                _ => 0,
            };
        }
        "stroke-linejoin" => {
            style.line_join = match value {
                "round" => 1,
                "bevel" => 2,
                _ => 0,
            };
        }
        "fill-rule" => style.evenodd = value.eq_ignore_ascii_case("evenodd"),
        _ => {}
    }
}

// Unknown paints (currentColor, url(#...)) keep the inherited value.
fn apply_paint(value: &str, out: &mut Option<Color>) {
    if value.trim().eq_ignore_ascii_case("none") {
        *out = None;
    } else if let Some(color) = parse_color(value) {
        *out = Some(color);
    }
}

fn parse_color(input: &str) -> Option<Color> {
    let v = input.trim();
    if v.starts_with('#') {
        return Color::from_hex(v);
    }
    if let Some(args) = v
        .strip_prefix("rgb(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts = parse_number_list(args);
        if parts.len() == 3 {
            return Some(Color::rgb(
                parts[0].clamp(0.0, 255.0) / 255.0,
                parts[1].clamp(0.0, 255.0) / 255.0,
                parts[2].clamp(0.0, 255.0) / 255.0,
            ));
        }
        return None;
    }
    match v.to_ascii_lowercase().as_str() {
        "black" => Some(Color::BLACK),
        "white" => Some(Color::WHITE),
        "red" => Some(Color::rgb(1.0, 0.0, 0.0)),
        "green" => Some(Color::rgb(0.0, 0.5, 0.0)),
        "blue" => Some(Color::rgb(0.0, 0.0, 1.0)),
        "navy" => Some(Color::rgb(0.0, 0.0, 0.5)),
        "gray" | "grey" => Some(Color::rgb(0.5, 0.5, 0.5)),
        _ => None,
    }
}

fn parse_number(input: &str) -> Option<f32> {
    // Unit suffixes are read as user units.
    let s = input
        .trim()
        .trim_end_matches("px")
        .trim_end_matches("pt")
        .trim();
    s.parse::<f32>().ok().filter(|v| v.is_finite())
}

fn parse_number_list(input: &str) -> Vec<f32> {
    input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<f32>().ok())
        .collect()
}

fn parse_viewbox(view_box: Option<&str>) -> Option<(f32, f32, f32, f32)> {
    let nums = parse_number_list(view_box?);
    if nums.len() != 4 || nums[2] <= 0.0 || nums[3] <= 0.0 {
        return None;
    }
    Some((nums[0], nums[1], nums[2], nums[3]))
}

// preserveAspectRatio="xMidYMid meet".
fn viewbox_to_viewport_matrix(view_box: Option<(f32, f32, f32, f32)>, w: f32, h: f32) -> Matrix {
    let Some((min_x, min_y, vb_w, vb_h)) = view_box else {
        return Matrix::identity();
    };
    let s = (w / vb_w).min(h / vb_h);
    let tx = (w - vb_w * s) * 0.5 - min_x * s;
    let ty = (h - vb_h * s) * 0.5 - min_y * s;
    Matrix::translate(tx, ty).mul(Matrix::scale(s, s))
}

fn parse_transform(input: &str) -> Matrix {
    let mut out = Matrix::identity();
    let mut s = input.trim();

    while let Some(open) = s.find('(') {
        let name = s[..open].trim().trim_start_matches(',').trim();
        let Some(close) = s[open + 1..].find(')') else {
            break;
        };
        let args = parse_number_list(&s[open + 1..open + 1 + close]);
        let arg = |idx: usize, default: f32| args.get(idx).copied().unwrap_or(default);

        let m = match name {
            "translate" => Matrix::translate(arg(0, 0.0), arg(1, 0.0)),
            "scale" => Matrix::scale(arg(0, 1.0), arg(1, arg(0, 1.0))),
            "rotate" if args.len() >= 3 => Matrix::translate(args[1], args[2])
                .mul(Matrix::rotate(args[0]))
                .mul(Matrix::translate(-args[1], -args[2])),
            "rotate" => Matrix::rotate(arg(0, 0.0)),
            "matrix" if args.len() >= 6 => Matrix {
                a: args[0],
                b: args[1],
                c: args[2],
                d: args[3],
                e: args[4],
                f: args[5],
            },
            _ => Matrix::identity(),
        };
        out = out.mul(m);
        s = s[open + 1 + close + 1..].trim_start();
    }

    out
}

fn attr_number(node: roxmltree::Node<'_, '_>, key: &str) -> f32 {
    node.attribute(key).and_then(parse_number).unwrap_or(0.0)
}

fn rect_to_path(node: roxmltree::Node<'_, '_>) -> Option<Vec<PathSeg>> {
    let x = attr_number(node, "x");
    let y = attr_number(node, "y");
    let w = parse_number(node.attribute("width")?)?;
    let h = parse_number(node.attribute("height")?)?;
    if w <= 0.0 || h <= 0.0 {
        return None;
    }
    Some(vec![
        PathSeg::MoveTo(x, y),
        PathSeg::LineTo(x + w, y),
        PathSeg::LineTo(x + w, y + h),
        PathSeg::LineTo(x, y + h),
        PathSeg::Close,
    ])
}

fn circle_to_path(node: roxmltree::Node<'_, '_>) -> Option<Vec<PathSeg>> {
    let r = parse_number(node.attribute("r")?)?;
    ellipse_segments(attr_number(node, "cx"), attr_number(node, "cy"), r, r)
}

fn ellipse_to_path(node: roxmltree::Node<'_, '_>) -> Option<Vec<PathSeg>> {
    let rx = parse_number(node.attribute("rx")?)?;
    let ry = parse_number(node.attribute("ry")?)?;
    ellipse_segments(attr_number(node, "cx"), attr_number(node, "cy"), rx, ry)
}

fn ellipse_segments(cx: f32, cy: f32, rx: f32, ry: f32) -> Option<Vec<PathSeg>> {
    if rx <= 0.0 || ry <= 0.0 {
        return None;
    }
    // Four-cubic approximation.
    let k = 0.552_284_75_f32;
    let ox = rx * k;
    let oy = ry * k;
    Some(vec![
        PathSeg::MoveTo(cx + rx, cy),
        PathSeg::CurveTo(cx + rx, cy + oy, cx + ox, cy + ry, cx, cy + ry),
        PathSeg::CurveTo(cx - ox, cy + ry, cx - rx, cy + oy, cx - rx, cy),
        PathSeg::CurveTo(cx - rx, cy - oy, cx - ox, cy - ry, cx, cy - ry),
        PathSeg::CurveTo(cx + ox, cy - ry, cx + rx, cy - oy, cx + rx, cy),
        PathSeg::Close,
    ])
}

fn line_to_path(node: roxmltree::Node<'_, '_>) -> Option<Vec<PathSeg>> {
    Some(vec![
        PathSeg::MoveTo(attr_number(node, "x1"), attr_number(node, "y1")),
        PathSeg::LineTo(attr_number(node, "x2"), attr_number(node, "y2")),
    ])
}

fn poly_points_to_path(node: roxmltree::Node<'_, '_>, close: bool) -> Option<Vec<PathSeg>> {
    let nums = parse_number_list(node.attribute("points")?);
    let points: Vec<(f32, f32)> = nums.chunks_exact(2).map(|p| (p[0], p[1])).collect();
    let (first, rest) = points.split_first()?;
    if rest.is_empty() {
        return None;
    }
    let mut segs = vec![PathSeg::MoveTo(first.0, first.1)];
    segs.extend(rest.iter().map(|&(x, y)| PathSeg::LineTo(x, y)));
    if close {
        segs.push(PathSeg::Close);
    }
    Some(segs)
}

fn parse_path_data(d: &str) -> Vec<PathSeg> {
    let mut segs = Vec::new();
    let mut p = PathParser::new(d);
    let mut cmd = ' ';
    let (mut cur_x, mut cur_y) = (0.0f32, 0.0f32);
    let (mut start_x, mut start_y) = (0.0f32, 0.0f32);
    // Reflection points for S/s and T/t.
    let mut last_cubic_ctrl2: Option<(f32, f32)> = None;
    let mut last_quad_ctrl: Option<(f32, f32)> = None;

    loop {
        let before = p.i;
        let Some(c) = p.next_command(&mut cmd) else {
            break;
        };
        let rel = c.is_ascii_lowercase();
        match c.to_ascii_uppercase() {
            'M' => {
                if let Some((x, y)) = p.next_pair() {
                    let (x, y) = if rel { (cur_x + x, cur_y + y) } else { (x, y) };
                    segs.push(PathSeg::MoveTo(x, y));
                    (cur_x, cur_y) = (x, y);
                    (start_x, start_y) = (x, y);
                    // Further pairs after a moveto are implicit linetos.
                    while let Some((x, y)) = p.next_pair() {
                        let (x, y) = if rel { (cur_x + x, cur_y + y) } else { (x, y) };
                        segs.push(PathSeg::LineTo(x, y));
                        (cur_x, cur_y) = (x, y);
                    }
                }
                last_cubic_ctrl2 = None;
                last_quad_ctrl = None;
            }
            'L' => {
                while let Some((x, y)) = p.next_pair() {
                    let (x, y) = if rel { (cur_x + x, cur_y + y) } else { (x, y) };
                    segs.push(PathSeg::LineTo(x, y));
                    (cur_x, cur_y) = (x, y);
                }
                last_cubic_ctrl2 = None;
                last_quad_ctrl = None;
            }
            'H' => {
                while let Some(x) = p.next_number() {
                    cur_x = if rel { cur_x + x } else { x };
                    segs.push(PathSeg::LineTo(cur_x, cur_y));
                }
                last_cubic_ctrl2 = None;
                last_quad_ctrl = None;
            }
            'V' => {
                while let Some(y) = p.next_number() {
                    cur_y = if rel { cur_y + y } else { y };
                    segs.push(PathSeg::LineTo(cur_x, cur_y));
                }
                last_cubic_ctrl2 = None;
                last_quad_ctrl = None;
            }
            'C' => {
                while let Some([x1, y1, x2, y2, x, y]) = p.next_numbers::<6>() {
                    let (ox, oy) = if rel { (cur_x, cur_y) } else { (0.0, 0.0) };
                    let (x1, y1, x2, y2, x, y) =
                        (x1 + ox, y1 + oy, x2 + ox, y2 + oy, x + ox, y + oy);
                    segs.push(PathSeg::CurveTo(x1, y1, x2, y2, x, y));
                    (cur_x, cur_y) = (x, y);
                    last_cubic_ctrl2 = Some((x2, y2));
                    last_quad_ctrl = None;
                }
            }
            'S' => {
                while let Some([x2, y2, x, y]) = p.next_numbers::<4>() {
                    let (ox, oy) = if rel { (cur_x, cur_y) } else { (0.0, 0.0) };
                    let (x2, y2, x, y) = (x2 + ox, y2 + oy, x + ox, y + oy);
                    let (x1, y1) = match last_cubic_ctrl2 {
                        Some((px, py)) => (2.0 * cur_x - px, 2.0 * cur_y - py),
                        None => (cur_x, cur_y),
                    };
                    segs.push(PathSeg::CurveTo(x1, y1, x2, y2, x, y));
                    (cur_x, cur_y) = (x, y);
                    last_cubic_ctrl2 = Some((x2, y2));
                    last_quad_ctrl = None;
                }
            }
            'Q' => {
                while let Some([x1, y1, x, y]) = p.next_numbers::<4>() {
                    let (ox, oy) = if rel { (cur_x, cur_y) } else { (0.0, 0.0) };
                    let (x1, y1, x, y) = (x1 + ox, y1 + oy, x + ox, y + oy);
                    let (c1x, c1y, c2x, c2y) = quad_to_cubic(cur_x, cur_y, x1, y1, x, y);
                    segs.push(PathSeg::CurveTo(c1x, c1y, c2x, c2y, x, y));
                    (cur_x, cur_y) = (x, y);
                    last_quad_ctrl = Some((x1, y1));
                    last_cubic_ctrl2 = None;
                }
            }
            'T' => {
                while let Some((x, y)) = p.next_pair() {
                    let (x, y) = if rel { (cur_x + x, cur_y + y) } else { (x, y) };
                    let (qx, qy) = match last_quad_ctrl {
                        Some((px, py)) => (2.0 * cur_x - px, 2.0 * cur_y - py),
                        None => (cur_x, cur_y),
                    };
                    let (c1x, c1y, c2x, c2y) = quad_to_cubic(cur_x, cur_y, qx, qy, x, y);
                    segs.push(PathSeg::CurveTo(c1x, c1y, c2x, c2y, x, y));
                    (cur_x, cur_y) = (x, y);
                    last_quad_ctrl = Some((qx, qy));
                    last_cubic_ctrl2 = None;
                }
            }
            'A' => {
                while let (Some(rx), Some(ry), Some(rot), Some(large), Some(sweep), Some((x, y))) = (
                    p.next_number(),
                    p.next_number(),
                    p.next_number(),
                    p.next_arc_flag(),
                    p.next_arc_flag(),
                    p.next_pair(),
                ) {
                    let (x, y) = if rel { (cur_x + x, cur_y + y) } else { (x, y) };
                    segs.extend(arc_to_cubics(
                        (cur_x, cur_y),
                        (rx, ry),
                        rot,
                        large,
                        sweep,
                        (x, y),
                    ));
                    (cur_x, cur_y) = (x, y);
                }
                last_cubic_ctrl2 = None;
                last_quad_ctrl = None;
            }
            'Z' => {
                segs.push(PathSeg::Close);
                (cur_x, cur_y) = (start_x, start_y);
                last_cubic_ctrl2 = None;
                last_quad_ctrl = None;
            }
            _ => {}
        }
        // Unknown command letters or dangling numbers: stop rather than spin.
        if p.i == before {
            break;
        }
    }

    segs
}

fn quad_to_cubic(x0: f32, y0: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> (f32, f32, f32, f32) {
    (
        x0 + (2.0 / 3.0) * (x1 - x0),
        y0 + (2.0 / 3.0) * (y1 - y0),
        x2 + (2.0 / 3.0) * (x1 - x2),
        y2 + (2.0 / 3.0) * (y1 - y2),
    )
}

// Endpoint-to-center conversion from the SVG 1.1 implementation notes, then
// one cubic per quarter turn.
fn arc_to_cubics(
    from: (f32, f32),
    radii: (f32, f32),
    x_axis_rotation_deg: f32,
    large_arc: bool,
    sweep: bool,
    to: (f32, f32),
) -> Vec<PathSeg> {
    use std::f32::consts::PI;

    let (x0, y0) = from;
    let (x1, y1) = to;
    let mut rx = radii.0.abs();
    let mut ry = radii.1.abs();
    if rx == 0.0 || ry == 0.0 || (x0 == x1 && y0 == y1) {
        return vec![PathSeg::LineTo(x1, y1)];
    }

    let phi = x_axis_rotation_deg.to_radians();
    let sin_phi = libm::sinf(phi);
    let cos_phi = libm::cosf(phi);

    let dx2 = (x0 - x1) / 2.0;
    let dy2 = (y0 - y1) / 2.0;
    let x1p = cos_phi * dx2 + sin_phi * dy2;
    let y1p = -sin_phi * dx2 + cos_phi * dy2;

    let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
    if lambda > 1.0 {
        let s = libm::sqrtf(lambda);
        rx *= s;
        ry *= s;
    }

    let rx2 = rx * rx;
    let ry2 = ry * ry;
    let num = rx2 * ry2 - rx2 * y1p * y1p - ry2 * x1p * x1p;
    let den = rx2 * y1p * y1p + ry2 * x1p * x1p;
    let coef = if den != 0.0 {
        let sign = if large_arc == sweep { -1.0 } else { 1.0 };
        sign * libm::sqrtf((num / den).max(0.0))
    } else {
        0.0
    };
    let cxp = coef * (rx * y1p / ry);
    let cyp = coef * (-ry * x1p / rx);
    let cx = cos_phi * cxp - sin_phi * cyp + (x0 + x1) / 2.0;
    let cy = sin_phi * cxp + cos_phi * cyp + (y0 + y1) / 2.0;

    let angle = |ux: f32, uy: f32, vx: f32, vy: f32| libm::atan2f(ux * vy - uy * vx, ux * vx + uy * vy);
    let ux = (x1p - cxp) / rx;
    let uy = (y1p - cyp) / ry;
    let vx = (-x1p - cxp) / rx;
    let vy = (-y1p - cyp) / ry;

    let mut theta = angle(1.0, 0.0, ux, uy);
    let mut dtheta = angle(ux, uy, vx, vy);
    if !sweep && dtheta > 0.0 {
        dtheta -= 2.0 * PI;
    } else if sweep && dtheta < 0.0 {
        dtheta += 2.0 * PI;
    }

    let count = libm::ceilf(dtheta.abs() / (PI / 2.0)).max(1.0) as i32;
    let delta = dtheta / count as f32;
    let k = (4.0 / 3.0) * libm::tanf(delta / 4.0);
    let map = |x: f32, y: f32| {
        let (x, y) = (rx * x, ry * y);
        (cx + cos_phi * x - sin_phi * y, cy + sin_phi * x + cos_phi * y)
    };

    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (s1, c1) = (libm::sinf(theta), libm::cosf(theta));
        let (s2, c2) = (libm::sinf(theta + delta), libm::cosf(theta + delta));
        let (c1x, c1y) = map(c1 - k * s1, s1 + k * c1);
        let (c2x, c2y) = map(c2 + k * s2, s2 - k * c2);
        let (ex, ey) = map(c2, s2);
        out.push(PathSeg::CurveTo(c1x, c1y, c2x, c2y, ex, ey));
        theta += delta;
    }
    out
}

struct PathParser<'a> {
    bytes: &'a [u8],
    i: usize,
}

impl<'a> PathParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            bytes: input.as_bytes(),
            i: 0,
        }
    }

    fn skip_ws(&mut self) {
        while self.i < self.bytes.len()
            && matches!(self.bytes[self.i], b' ' | b'\n' | b'\r' | b'\t' | b',')
        {
            self.i += 1;
        }
    }

    // A bare number after a finished command repeats the previous command.
    fn next_command(&mut self, current: &mut char) -> Option<char> {
        self.skip_ws();
        let b = *self.bytes.get(self.i)?;
        if b.is_ascii_alphabetic() {
            *current = b as char;
            self.i += 1;
        }
        Some(*current)
    }

    fn next_number(&mut self) -> Option<f32> {
        self.skip_ws();
        let start = self.i;
        let mut has_digits = false;
        let digits = |p: &mut Self, has: &mut bool| {
            while p.i < p.bytes.len() && p.bytes[p.i].is_ascii_digit() {
                p.i += 1;
                *has = true;
            }
        };

        if self.i < self.bytes.len() && matches!(self.bytes[self.i], b'+' | b'-') {
            self.i += 1;
        }
        digits(self, &mut has_digits);
        if self.i < self.bytes.len() && self.bytes[self.i] == b'.' {
            self.i += 1;
            digits(self, &mut has_digits);
        }
        if has_digits && self.i < self.bytes.len() && matches!(self.bytes[self.i], b'e' | b'E') {
            let mark = self.i;
            self.i += 1;
            if self.i < self.bytes.len() && matches!(self.bytes[self.i], b'+' | b'-') {
                self.i += 1;
            }
            let mut exp_digits = false;
            digits(self, &mut exp_digits);
            if !exp_digits {
                self.i = mark;
            }
        }

        if !has_digits {
            self.i = start;
            return None;
        }
        std::str::from_utf8(&self.bytes[start..self.i])
            .ok()?
            .parse::<f32>()
            .ok()
    }

    fn next_numbers<const N: usize>(&mut self) -> Option<[f32; N]> {
        let start = self.i;
        let mut out = [0.0f32; N];
        for slot in out.iter_mut() {
            match self.next_number() {
                Some(v) => *slot = v,
                None => {
                    self.i = start;
                    return None;
                }
            }
        }
        Some(out)
    }

    // Flags may be packed without separators ("a5 5 0 01 20 20").
    fn next_arc_flag(&mut self) -> Option<bool> {
        self.skip_ws();
        match self.bytes.get(self.i)? {
            b'0' => {
                self.i += 1;
                Some(false)
            }
            b'1' => {
                self.i += 1;
                Some(true)
            }
            _ => None,
        }
    }

    fn next_pair(&mut self) -> Option<(f32, f32)> {
        let [x, y] = self.next_numbers::<2>()?;
        Some((x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Command;
    use crate::types::Size;

    const BADGE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 50">
        <rect x="0" y="0" width="100" height="50" fill="#1f3a5f"/>
        <g transform="translate(10,10)" style="fill:none;stroke:#ffffff;stroke-width:2">
          <circle cx="15" cy="15" r="10"/>
          <path d="M30 5 h40 v20 h-40 z"/>
        </g>
    </svg>"##;

    #[test]
    fn parses_intrinsic_size_from_viewbox() {
        let logo = LogoArt::parse(BADGE).expect("logo");
        assert_eq!((logo.width, logo.height), (100.0, 50.0));
        assert_eq!(logo.paths.len(), 3);
        assert!(logo.paths[1].style.fill.is_none());
        assert_eq!(logo.paths[1].style.stroke, Some(Color::WHITE));
    }

    #[test]
    fn fit_preserves_aspect_ratio_within_box() {
        let logo = LogoArt::parse(BADGE).expect("logo");
        let (w, h, s) = logo.fit(Pt::from_f32(200.0), Pt::from_f32(56.0));
        assert_eq!(w, Pt::from_f32(112.0));
        assert_eq!(h, Pt::from_f32(56.0));
        assert!((s - 1.12).abs() < 1e-5);
    }

    #[test]
    fn rejects_markup_without_drawable_content() {
        assert!(LogoArt::parse("not svg at all").is_none());
        assert!(LogoArt::parse(r#"<svg width="10" height="10"><text>Hi</text></svg>"#).is_none());
        assert!(LogoArt::parse(r#"<svg><rect width="5" height="5"/></svg>"#).is_none());
    }

    #[test]
    fn draw_emits_translated_geometry() {
        let logo = LogoArt::parse(r#"<svg width="10" height="10"><rect width="10" height="10" fill="red"/></svg>"#)
            .expect("logo");
        let mut canvas = Canvas::new(Size::letter());
        logo.draw(&mut canvas, Pt::from_f32(100.0), Pt::from_f32(20.0), 2.0);
        let doc = canvas.finish();
        let cmds = &doc.pages[0].commands;
        assert!(cmds.contains(&Command::MoveTo {
            x: Pt::from_f32(100.0),
            y: Pt::from_f32(20.0)
        }));
        assert!(cmds.contains(&Command::LineTo {
            x: Pt::from_f32(120.0),
            y: Pt::from_f32(40.0)
        }));
        assert!(cmds.contains(&Command::Fill));
    }

    #[test]
    fn parses_relative_curves_and_compact_arcs() {
        let segs = parse_path_data("m0 0 q10 0 10 10 t10 10 A5 5 0 01 40 40 z");
        assert!(matches!(segs[0], PathSeg::MoveTo(_, _)));
        assert!(segs.iter().filter(|s| matches!(s, PathSeg::CurveTo(..))).count() >= 3);
        assert_eq!(segs.last(), Some(&PathSeg::Close));
    }

    #[test]
    fn malformed_path_data_terminates() {
        let segs = parse_path_data("M 0 0 L 10 X 5 5");
        assert_eq!(segs, vec![PathSeg::MoveTo(0.0, 0.0)]);
    }

    #[test]
    fn transform_lists_compose_left_to_right() {
        let m = parse_transform("translate(10 20) scale(2)");
        assert_eq!(m.apply(1.0, 1.0), (12.0, 22.0));
    }
}
