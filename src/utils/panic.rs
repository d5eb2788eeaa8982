/// Install the colored panic handler. Should run before anything else in main.
pub fn setup() {
    color_backtrace::install();
}
