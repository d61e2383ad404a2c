use timewarp::{
    CutConfig, ErrorKind, Fps, Frame, FrameRange, FrameSize, FrameSource, InMemorySink,
    InMemorySource, ScaleFactor, WarpConfig, cut_stream, warp,
};

fn gradient(n: u8, w: u32, h: u32) -> Vec<Frame> {
    (0..n)
        .map(|t| Frame::from_fn(w, h, |x, y| image::Rgb([t, x as u8, y as u8])))
        .collect()
}

#[test]
fn warp_along_y_maps_rows_to_output_frames() {
    let mut src = InMemorySource::new(gradient(6, 4, 8), Fps::new(25, 1).unwrap());
    let mut cfg = WarpConfig::new("<memory>", "out.mp4");
    cfg.axis = " Y ".to_string();
    cfg.out_scale = ScaleFactor::identity();
    let mut sink = InMemorySink::new();

    let report = warp(&mut src, &cfg, &mut sink, None).unwrap();
    assert_eq!(report.shape, (8, 6, 4, 3));
    let emit = report.emit.unwrap();
    assert_eq!(emit.planned, Some(8));
    assert_eq!(emit.written, 8);

    // Output frame h is a (W x T) image whose row t is row h of source frame t.
    let out = &sink.frames()[5].1;
    assert_eq!(out.dimensions(), (4, 6));
    for t in 0..6u32 {
        for x in 0..4u32 {
            assert_eq!(out.get_pixel(x, t).0, [t as u8, x as u8, 5]);
        }
    }
}

#[test]
fn warp_trims_overstated_frame_count() {
    let mut src = InMemorySource::new(gradient(5, 2, 2), Fps::default()).with_declared_frames(900);
    let mut cfg = WarpConfig::new("<memory>", "out.mp4");
    cfg.out_scale = ScaleFactor::identity();
    let mut sink = InMemorySink::new();

    let report = warp(&mut src, &cfg, &mut sink, None).unwrap();
    assert_eq!(report.ingest.expected, 900);
    assert_eq!(report.ingest.stored, 5);
    assert_eq!(report.shape, (2, 2, 5, 3));
}

#[test]
fn warp_truncated_source_keeps_frames_read_so_far() {
    let mut src = InMemorySource::new(gradient(10, 4, 4), Fps::default())
        .with_decode_failure_at(7)
        .with_declared_frames(10);
    let mut cfg = WarpConfig::new("<memory>", "out.mp4");
    cfg.write = false;
    let mut sink = InMemorySink::new();

    let report = warp(&mut src, &cfg, &mut sink, None).unwrap();
    assert_eq!(report.ingest.read, 7);
    assert_eq!(report.shape, (4, 4, 7, 3));
    assert_eq!(report.emit.unwrap().written, 0);
    assert!(sink.config().is_none());
}

#[test]
fn unknown_axis_is_reported_but_not_fatal() {
    let mut src = InMemorySource::new(gradient(2, 2, 2), Fps::default());
    let mut cfg = WarpConfig::new("<memory>", "out.mp4");
    cfg.axis = "z".to_string();
    let mut sink = InMemorySink::new();

    let report = warp(&mut src, &cfg, &mut sink, None).unwrap();
    assert_eq!(report.axis_error.unwrap().kind(), ErrorKind::InvalidAxis);
    assert_eq!(report.emit.unwrap().written, 2);
    // Default output scale doubles the width.
    assert_eq!(sink.config().unwrap().size(), FrameSize::new(4, 2));
}

#[test]
fn cut_keeps_inclusive_range_and_counts_all_frames() {
    let mut src = InMemorySource::new(gradient(40, 4, 4), Fps::default());
    let mut cfg = CutConfig::new("<memory>", "out.mp4");
    cfg.range = FrameRange::new(Some(10), Some(19)).unwrap();
    let mut sink = InMemorySink::new();

    let report = cut_stream(&mut src, &cfg, &mut sink).unwrap().unwrap();
    assert_eq!(report.seen, 40);
    assert_eq!(report.forwarded, 10);
    assert_eq!(report.emit.written, 10);
    assert_eq!(sink.frames()[0].1.get_pixel(0, 0).0[0], 10);
    assert_eq!(sink.frames()[9].1.get_pixel(0, 0).0[0], 19);
    assert!(src.state().is_closed());
}

#[test]
fn cut_with_scale_halves_each_axis() {
    let mut src = InMemorySource::new(gradient(3, 12, 8), Fps::default());
    let mut cfg = CutConfig::new("<memory>", "out.mp4");
    cfg.scale = 0.5;
    let mut sink = InMemorySink::new();

    cut_stream(&mut src, &cfg, &mut sink).unwrap().unwrap();
    assert_eq!(sink.config().unwrap().size(), FrameSize::new(6, 4));
    assert!(sink.frames().iter().all(|(_, f)| f.dimensions() == (6, 4)));
}
