fn main() {
    render_lessons::demos::launch("shader_class", render_lessons::demos::shader_class::run);
}
