fn main() {
    render_lessons::demos::launch("gamma_correction", render_lessons::demos::gamma_correction::run);
}
