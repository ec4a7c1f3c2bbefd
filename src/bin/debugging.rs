fn main() {
    render_lessons::demos::launch("debugging", render_lessons::demos::debugging::run);
}
