fn main() {
    render_lessons::demos::launch("skybox", render_lessons::demos::skybox::run);
}
