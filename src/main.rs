fn main() {
    facetrack_lib::run()
}
