use d30::{MonoBitmap, Printer, Protocol, DEFAULT_DEVICE, DEFAULT_TIMEOUT};

fn main() {
    let mut printer = Printer::open(Protocol::D30_V1, DEFAULT_DEVICE, DEFAULT_TIMEOUT)
        .expect("cannot connect to printer");
    printer.initialize().expect("failed to initialize printer");

    // 8x8 checkerboard
    let pixels = (0..96 * 320)
        .map(|i| {
            let (x, y) = (i % 96, i / 96);
            (x / 8 + y / 8) % 2 == 0
        })
        .collect();
    let bitmap = MonoBitmap::new(96, pixels).unwrap();

    let bands = printer
        .print(&bitmap)
        .expect("failed to print pattern");
    println!("sent {bands} bands");
}
