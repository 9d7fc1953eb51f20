fn main() {
    clinnotes_lib::run()
}
