fn main() {
    render_lessons::demos::launch("asteroid_field", render_lessons::demos::asteroid_field::run);
}
