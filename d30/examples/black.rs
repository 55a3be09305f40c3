use d30::{MonoBitmap, Printer, Protocol, DEFAULT_DEVICE, DEFAULT_TIMEOUT};

fn main() {
	let mut printer = Printer::open(Protocol::D30_V1, DEFAULT_DEVICE, DEFAULT_TIMEOUT)
		.expect("cannot connect to printer");
	printer.initialize().expect("failed to initialize printer");
	let bitmap = MonoBitmap::new(96, vec![true; 96 * 320]).unwrap();
	printer
		.print(&bitmap)
		.expect("failed to print black label");
}
